use crate::cli::ChatArgs;
use crate::conversation::client::{ AgentClient, ClientError, HttpAgentClient };
use crate::conversation::ConversationController;
use crate::render::terminal::TerminalView;
use log::{ info, error };
use std::error::Error;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio::signal;

enum Command<'a> {
    Quit,
    Reset,
    Save(&'a str),
    Send(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    match trimmed.split_once(' ') {
        _ if trimmed == "/quit" || trimmed == "/exit" => Command::Quit,
        _ if trimmed == "/reset" => Command::Reset,
        Some(("/save", path)) if !path.trim().is_empty() => Command::Save(path.trim()),
        _ => Command::Send(line),
    }
}

/// Interactive loop: one request at a time, Ctrl-C cancels the request in
/// flight and quits when idle.
pub async fn run(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = HttpAgentClient::new(&args.proxy_url)?;
    info!("Chatting through proxy at {}", client.endpoint());

    let mut controller = ConversationController::new();
    let mut view = TerminalView::new(std::io::stdout(), args.chart_width);
    view.show_conversation(controller.state())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        view.prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let input = match parse_command(&line) {
            Command::Quit => {
                break;
            }
            Command::Reset => {
                controller.reset();
                view.show_conversation(controller.state())?;
                continue;
            }
            Command::Save(path) => {
                let json = serde_json::to_string_pretty(controller.state().messages())?;
                match tokio::fs::write(path, json).await {
                    Ok(()) => view.status(&format!("Saved transcript to {}", path))?,
                    Err(e) => {
                        error!("Failed to save transcript to {}: {}", path, e);
                        view.status(&format!("Could not save transcript: {}", e))?;
                    }
                }
                continue;
            }
            Command::Send(input) => input,
        };

        let Some(pending) = controller.begin_send(input) else {
            continue;
        };
        view.status("thinking…")?;

        let outcome = tokio::select! {
            outcome = client.send(&pending.request, pending.token.clone()) => outcome,
            _ = signal::ctrl_c() => {
                controller.cancel();
                Err(ClientError::Cancelled)
            }
        };

        if let Some(message) = controller.complete(pending, outcome) {
            view.show_message(message)?;
        }
    }

    Ok(())
}
