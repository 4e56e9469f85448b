mod args;
mod render;

use args::Args;
use clap::Parser;
use render::Terminal;
use stockroom_agent::{ChatSession, TurnOutcome};
use stockroom_config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(&args.config)?;

    if let Some(model) = args.model {
        config.llm.model = model;
    }

    let _telemetry_guard = stockroom_telemetry::init(config.telemetry.as_ref(), "warn")?;

    let mut session = ChatSession::from_config(&config)?;
    tracing::info!(model = session.model_id(), "stockroom ready");

    if let Some(prompt) = args.once {
        return one_shot(&mut session, &prompt, !args.no_stream).await;
    }

    repl(&mut session, !args.no_stream).await
}

async fn one_shot(session: &mut ChatSession, prompt: &str, stream: bool) -> anyhow::Result<()> {
    let mut terminal = Terminal::default();

    match turn(session, prompt, &mut terminal, stream).await {
        Ok(_) => Ok(()),
        Err(message) => anyhow::bail!(message),
    }
}

async fn repl(session: &mut ChatSession, stream: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut terminal = Terminal::default();

    eprintln!("Ask for an image. /clear starts over, /exit or Ctrl-D quits.");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else { break };
        let prompt = line.trim();

        match prompt {
            "" => continue,
            "/exit" => break,
            "/clear" => {
                session.clear();
                eprintln!("conversation cleared");
                continue;
            }
            _ => {}
        }

        match turn(session, prompt, &mut terminal, stream).await {
            Ok(TurnOutcome::Cancelled(_)) => eprintln!("(cancelled)"),
            Ok(TurnOutcome::Completed(_)) => {}
            Err(message) => eprintln!("error: {message}"),
        }
    }

    Ok(())
}

/// Run one turn, cancelling it on Ctrl-C
async fn turn(
    session: &mut ChatSession,
    prompt: &str,
    terminal: &mut Terminal,
    stream: bool,
) -> Result<TurnOutcome, String> {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = if stream {
        session.send(prompt, terminal, &cancel).await
    } else {
        session.generate(prompt, terminal, &cancel).await
    };

    interrupt.abort();
    terminal.finish_reply();

    result.map_err(|e| {
        tracing::debug!(error = %e, "turn failed");
        e.client_message()
    })
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        cancel.cancel();
    }
}
