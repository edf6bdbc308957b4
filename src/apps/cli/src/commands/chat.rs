//! `mentora chat`: talk to the mentor agent

use anyhow::Result;
use mentora_core::agentic::conversation::ChatSession;
use mentora_core::infrastructure::ai::{ChatClient, ChatStreamDecoder, ChatTransport};
use mentora_core::service::config::AppConfig;
use mentora_core::{ChatMessage, MentoraError};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;

const HELP: &str = "Commands: /resend, /reset, /quit";

pub async fn run(config: &AppConfig, agent_id: Option<String>, prompt: Option<String>) -> Result<()> {
    let agent_id = agent_id
        .or_else(|| config.chat.agent_id.clone())
        .unwrap_or_default();
    let client = ChatClient::new(config.chat.endpoint.clone())?;
    let mut session = ChatSession::new(client, agent_id)
        .with_decoder(ChatStreamDecoder::with_idle_timeout(config.chat.idle_timeout()));

    if let Some(prompt) = prompt {
        return run_turn(&mut session, Turn::Send(&prompt)).await;
    }

    if let Some(greeting) = session.messages().first() {
        println!("{}\n", greeting.content);
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = read_prompt(&mut lines, interrupted()).await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/reset" => {
                session.reset();
                println!("Conversation cleared.");
            }
            "/resend" => report(run_turn(&mut session, Turn::Resend).await),
            prompt => report(run_turn(&mut session, Turn::Send(prompt)).await),
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C. After the first turn the process no longer dies on
/// SIGINT by default, so the prompt waits on this instead.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Next prompt line; `None` on end of input or when `interrupt` fires first
async fn read_prompt<R, I>(lines: &mut Lines<R>, interrupt: I) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = interrupt => {
            eprintln!();
            Ok(None)
        }
        line = lines.next_line() => Ok(line?),
    }
}

enum Turn<'a> {
    Send(&'a str),
    Resend,
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}

/// Run one turn, echoing the reply as it streams; Ctrl-C cancels the turn
async fn run_turn<T: ChatTransport>(session: &mut ChatSession<T>, turn: Turn<'_>) -> Result<()> {
    let cancel_token = CancellationToken::new();
    let mut updates = session.subscribe();
    let mut printed = 0usize;

    let outcome = {
        let send = async {
            match turn {
                Turn::Send(prompt) => session.send(prompt, &cancel_token).await,
                Turn::Resend => session.resend(&cancel_token).await,
            }
        };
        tokio::pin!(send);

        loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                Ok(()) = updates.changed() => {
                    let messages = updates.borrow_and_update().clone();
                    print_progress(&messages, &mut printed);
                }
                _ = tokio::signal::ctrl_c(), if !cancel_token.is_cancelled() => {
                    cancel_token.cancel();
                }
            }
        }
    };

    match outcome {
        Ok(reply) => {
            if let Some(rest) = reply.content.get(printed..) {
                print!("{}", rest);
            }
            println!();
            Ok(())
        }
        Err(MentoraError::Validation(message)) => Err(anyhow::anyhow!(message)),
        Err(e) => {
            if printed > 0 {
                println!();
            }
            if let Some(failed) = session.messages().last() {
                println!("{}", failed.content);
            }
            eprintln!("({}; type /resend to try again)", e);
            Ok(())
        }
    }
}

fn print_progress(messages: &[ChatMessage], printed: &mut usize) {
    use std::io::Write;

    let Some(reply) = messages.last().filter(|m| !m.is_user() && m.is_streaming) else {
        return;
    };
    if let Some(fresh) = reply.content.get(*printed..) {
        print!("{}", fresh);
        *printed = reply.content.len();
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{pending, ready};

    #[tokio::test]
    async fn prompt_returns_typed_line() {
        let mut lines = BufReader::new(&b"what is a borrow?\n"[..]).lines();
        let line = read_prompt(&mut lines, pending()).await.expect("read");
        assert_eq!(line.as_deref(), Some("what is a borrow?"));
        assert!(read_prompt(&mut lines, pending()).await.expect("read").is_none());
    }

    #[tokio::test]
    async fn interrupt_ends_a_waiting_prompt() {
        // Writer kept open so the read never completes on its own
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let line = read_prompt(&mut lines, ready(())).await.expect("read");
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn interrupt_wins_over_pending_input() {
        let mut lines = BufReader::new(&b"/help\n"[..]).lines();
        assert!(read_prompt(&mut lines, ready(())).await.expect("read").is_none());
    }
}
