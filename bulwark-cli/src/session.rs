//! Line-driven interactive session
//!
//! Breaker state lives only in memory, so watching it change or resetting it
//! needs one long-lived agent. A session reads commands line by line and runs
//! them against the same [`CallAgent`].

use bulwark_resilience::FailureKind;
use bulwark_services::FailureSchedule;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::{CallAgent, Contact};

const HELP: &str = "\
Commands:
  call <name> <phone>      place a call (the phone number is the last word)
  outage <n> [kind]        fail the next n speech requests
                           kinds: unavailable, timeout, network, auth, invalid, quota
  status                   probe services and show breakers and health
  reset                    close all breakers and clear simulated outages
  help                     show this text
  quit                     leave the session
";

/// What the session loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Reply(String),
    Quit,
}

fn parse_failure(kind: &str) -> Option<FailureKind> {
    match kind.to_ascii_lowercase().as_str() {
        "unavailable" => Some(FailureKind::ServiceUnavailable),
        "timeout" => Some(FailureKind::Timeout),
        "network" => Some(FailureKind::NetworkError),
        "auth" => Some(FailureKind::AuthenticationFailure),
        "invalid" => Some(FailureKind::InvalidRequest),
        "quota" => Some(FailureKind::QuotaExceeded),
        _ => None,
    }
}

/// Run one command line against `agent`
pub async fn execute(agent: &CallAgent, line: &str) -> Step {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Step::Reply(String::new());
    };

    match command.to_ascii_lowercase().as_str() {
        "call" => {
            let Some((&phone, name)) = args.split_last().filter(|(_, name)| !name.is_empty())
            else {
                return Step::Reply("usage: call <name> <phone>".to_string());
            };
            let contact = Contact::new(name.join(" "), phone);
            match agent.make_call(&contact).await {
                Ok(outcome) => Step::Reply(format!(
                    "call to {} completed ({} bytes of audio)",
                    outcome.contact.name, outcome.audio_bytes
                )),
                Err(e) => Step::Reply(format!("call to {} skipped: {}", contact.name, e)),
            }
        }
        "outage" => {
            let count = args.first().and_then(|n| n.parse::<u32>().ok());
            let kind = match args.get(1) {
                Some(kind) => parse_failure(kind),
                None => Some(FailureKind::ServiceUnavailable),
            };
            let (Some(count), Some(kind)) = (count, kind) else {
                return Step::Reply("usage: outage <n> [kind]".to_string());
            };
            if agent.simulate_speech_outage(FailureSchedule::first_calls(count, kind)) {
                Step::Reply(format!("next {} speech requests fail with {}", count, kind))
            } else {
                Step::Reply("outage simulation needs services.mode = simulated".to_string())
            }
        }
        "status" => {
            agent.health().check_now().await;
            Step::Reply(agent.system_status().to_string())
        }
        "reset" => {
            agent.reset();
            Step::Reply("all circuit breakers CLOSED, failure counters cleared".to_string())
        }
        "help" | "?" => Step::Reply(HELP.to_string()),
        "quit" | "exit" => Step::Quit,
        other => Step::Reply(format!("unknown command '{}', try 'help'", other)),
    }
}

/// Read commands from `input` until `quit` or end of input
pub async fn run<R, W>(agent: &CallAgent, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(b"bulwark> ").await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match execute(agent, &line).await {
            Step::Quit => break,
            Step::Reply(reply) => {
                if !reply.is_empty() {
                    output.write_all(reply.trim_end().as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
            }
        }
        output.write_all(b"bulwark> ").await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await
}
