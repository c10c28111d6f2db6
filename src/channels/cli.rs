//! CLI front end: a stdin/stdout REPL over the conversation controller.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::api::{ChatBackend, ProfileUpdate};
use crate::conversation::{BirthDetails, ControllerEvent, ConversationController, Role, Topic};
use crate::session::Credentials;

const HELP: &str = "\
Commands:
  /job, /marriage, /finance     ask about a preset topic
  /topic <name>                 same, by name (career, relationships, wealth)
  /reset                        start a new consultation
  /retry                        restart after an error
  /details                      show recorded birth details
  /set date=.. time=.. place=..  replace birth details (saved to profile when logged in)
  /dismiss                      hide the error banner
  /conversations                list saved conversations
  /history <conversation id>    show a saved conversation
  /help                         show this help
  /quit                         exit
Anything else is sent as a message.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Send(String),
    Topic(Topic),
    Reset,
    Retry,
    Details,
    SetDetails(BirthDetails),
    Dismiss,
    Conversations,
    History(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line of input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<CliCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(CliCommand::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "topic" => match arg.parse::<Topic>() {
            Ok(topic) => CliCommand::Topic(topic),
            Err(_) => CliCommand::Unknown(line.to_string()),
        },
        "job" => CliCommand::Topic(Topic::Job),
        "marriage" => CliCommand::Topic(Topic::Marriage),
        "finance" => CliCommand::Topic(Topic::Finance),
        "reset" | "new" => CliCommand::Reset,
        "retry" => CliCommand::Retry,
        "details" => CliCommand::Details,
        "set" => match parse_details(arg) {
            Some(details) => CliCommand::SetDetails(details),
            None => CliCommand::Unknown(line.to_string()),
        },
        "dismiss" => CliCommand::Dismiss,
        "conversations" => CliCommand::Conversations,
        "history" if !arg.is_empty() => CliCommand::History(arg.to_string()),
        "help" => CliCommand::Help,
        "quit" | "exit" => CliCommand::Quit,
        _ => CliCommand::Unknown(line.to_string()),
    };
    Some(command)
}

/// Parse `key=value` pairs. Words without `=` extend the previous value, so
/// `place=Mumbai, India` keeps its space.
fn parse_details(arg: &str) -> Option<BirthDetails> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for word in arg.split_whitespace() {
        match word.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                pairs.push((key.to_ascii_lowercase(), value.to_string()));
            }
            _ => {
                let (_, value) = pairs.last_mut()?;
                value.push(' ');
                value.push_str(word);
            }
        }
    }

    let details = pairs
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .fold(BirthDetails::new(), |details, (key, value)| {
            details.with(key, value.trim())
        });
    (!details.is_empty()).then_some(details)
}

/// Text to print for an event, if any.
pub fn render_event(event: &ControllerEvent) -> Option<String> {
    match event {
        ControllerEvent::MessageAppended { message } => match message.role {
            Role::Assistant => Some(format!("\n{}\n", message.content)),
            // The user already sees what they typed
            Role::User => None,
        },
        ControllerEvent::TopicsShown { topics } => {
            let options: Vec<String> = topics
                .iter()
                .map(|t| format!("/{t}  ({})", t.label()))
                .collect();
            Some(format!("Topics: {}", options.join("  |  ")))
        }
        ControllerEvent::Loading { active: true } => Some("⏳ Consulting the stars...".to_string()),
        ControllerEvent::Error { message } => {
            Some(format!("⚠️  {message} (type /retry to start over)"))
        }
        ControllerEvent::HistoryCleared => Some("--- new consultation ---".to_string()),
        _ => None,
    }
}

/// Interactive terminal session.
pub struct CliFrontend {
    controller: Arc<ConversationController>,
    backend: Arc<dyn ChatBackend>,
    credentials: Credentials,
}

impl CliFrontend {
    pub fn new(
        controller: Arc<ConversationController>,
        backend: Arc<dyn ChatBackend>,
        credentials: Credentials,
    ) -> Self {
        Self {
            controller,
            backend,
            credentials,
        }
    }

    /// Run until EOF or `/quit`.
    pub async fn run(&self) {
        let renderer = tokio::spawn(render_loop(self.controller.subscribe()));

        if self.credentials.is_authenticated() {
            self.controller.start_from_profile().await;
        } else {
            self.controller.start(None).await;
        }

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        eprint!("> ");

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(command) = parse_command(&line) else {
                        eprint!("> ");
                        continue;
                    };
                    if command == CliCommand::Quit {
                        break;
                    }
                    self.handle(command).await;
                    eprint!("> ");
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }

        renderer.abort();
    }

    async fn handle(&self, command: CliCommand) {
        let result = match command {
            CliCommand::Send(text) => self.controller.send_message(&text).await,
            CliCommand::Topic(topic) => self.controller.select_topic(topic).await,
            CliCommand::Reset => {
                self.controller.reset().await;
                Ok(())
            }
            CliCommand::Retry => {
                self.controller.retry().await;
                Ok(())
            }
            CliCommand::Details => {
                let snapshot = self.controller.snapshot().await;
                if snapshot.birth_details.is_empty() {
                    eprintln!("No birth details recorded yet.");
                }
                for (key, value) in snapshot.birth_details.iter() {
                    eprintln!("  {key}: {value}");
                }
                Ok(())
            }
            CliCommand::SetDetails(details) => {
                self.controller.update_birth_details(details.clone()).await;
                if self.credentials.is_authenticated() {
                    self.save_profile(details).await;
                }
                eprintln!("Birth details updated.");
                Ok(())
            }
            CliCommand::Dismiss => {
                self.controller.dismiss_error().await;
                Ok(())
            }
            CliCommand::Conversations => {
                self.list_conversations().await;
                Ok(())
            }
            CliCommand::History(id) => {
                self.show_history(&id).await;
                Ok(())
            }
            CliCommand::Help => {
                eprintln!("{HELP}");
                Ok(())
            }
            CliCommand::Unknown(line) => {
                eprintln!("Unknown command: {line} (try /help)");
                Ok(())
            }
            CliCommand::Quit => Ok(()),
        };

        if let Err(e) = result {
            eprintln!("❌ {e}");
        }
    }

    /// Store birth details on the profile, keeping the stored name.
    async fn save_profile(&self, birth_details: BirthDetails) {
        let name = match self.backend.load_profile(&self.credentials).await {
            Ok(profile) => profile.name,
            Err(e) => {
                eprintln!("❌ {}", e.banner_text());
                return;
            }
        };
        let update = ProfileUpdate {
            name,
            birth_details,
        };
        if let Err(e) = self.backend.update_profile(&self.credentials, &update).await {
            eprintln!("❌ {}", e.banner_text());
        }
    }

    async fn list_conversations(&self) {
        match self.backend.conversations(&self.credentials).await {
            Ok(conversations) if conversations.is_empty() => eprintln!("No saved conversations."),
            Ok(conversations) => {
                for c in conversations {
                    eprintln!("  {}  {}  (updated {})", c.id, c.title, c.last_updated);
                }
            }
            Err(e) => eprintln!("❌ {}", e.banner_text()),
        }
    }

    async fn show_history(&self, conversation_id: &str) {
        match self.backend.history(&self.credentials, conversation_id).await {
            Ok(history) => {
                for m in history.messages {
                    println!("[{}] {}: {}", m.timestamp, m.role, m.content);
                }
            }
            Err(e) => eprintln!("❌ {}", e.banner_text()),
        }
    }
}

async fn render_loop(mut events: broadcast::Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(text) = render_event(&event) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Renderer lagged, skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(
            parse_command("  Born 15/08/1990 in Pune "),
            Some(CliCommand::Send("Born 15/08/1990 in Pune".into()))
        );
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn topic_command_accepts_aliases() {
        assert_eq!(parse_command("/marriage"), Some(CliCommand::Topic(Topic::Marriage)));
        assert_eq!(parse_command("/topic career"), Some(CliCommand::Topic(Topic::Job)));
        assert_eq!(
            parse_command("/TOPIC Finance"),
            Some(CliCommand::Topic(Topic::Finance))
        );
        assert_eq!(
            parse_command("/topic health"),
            Some(CliCommand::Unknown("/topic health".into()))
        );
    }

    #[test]
    fn history_requires_id() {
        assert_eq!(
            parse_command("/history conv-42"),
            Some(CliCommand::History("conv-42".into()))
        );
        assert_eq!(
            parse_command("/history"),
            Some(CliCommand::Unknown("/history".into()))
        );
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("/reset"), Some(CliCommand::Reset));
        assert_eq!(parse_command("/retry"), Some(CliCommand::Retry));
        assert_eq!(parse_command("/quit"), Some(CliCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(CliCommand::Quit));
        assert_eq!(parse_command("/details"), Some(CliCommand::Details));
    }

    #[test]
    fn set_parses_key_value_pairs() {
        let Some(CliCommand::SetDetails(details)) =
            parse_command("/set date=15/08/1990 time=14:30 place=Mumbai, India")
        else {
            panic!("expected details");
        };
        assert_eq!(details.date(), Some("15/08/1990"));
        assert_eq!(details.time(), Some("14:30"));
        assert_eq!(details.place(), Some("Mumbai, India"));
    }

    #[test]
    fn set_rejects_input_without_pairs() {
        assert_eq!(
            parse_command("/set Mumbai"),
            Some(CliCommand::Unknown("/set Mumbai".into()))
        );
        assert_eq!(parse_command("/set"), Some(CliCommand::Unknown("/set".into())));
        assert_eq!(parse_command("/dismiss"), Some(CliCommand::Dismiss));
    }

    #[test]
    fn renders_assistant_messages_only() {
        let assistant = ControllerEvent::MessageAppended {
            message: Message::assistant("Your ascendant is Leo."),
        };
        assert_eq!(
            render_event(&assistant).as_deref(),
            Some("\nYour ascendant is Leo.\n")
        );

        let user = ControllerEvent::MessageAppended {
            message: Message::user("hi"),
        };
        assert!(render_event(&user).is_none());
    }

    #[test]
    fn renders_topic_choices() {
        let event = ControllerEvent::TopicsShown {
            topics: Topic::ALL.to_vec(),
        };
        let text = render_event(&event).unwrap();
        assert!(text.contains("/job"));
        assert!(text.contains("/marriage"));
        assert!(text.contains("Finance & Wealth"));
    }

    #[test]
    fn renders_error_with_retry_hint() {
        let event = ControllerEvent::Error {
            message: "Failed to process query".into(),
        };
        assert!(render_event(&event).unwrap().contains("/retry"));
        assert!(render_event(&ControllerEvent::Loading { active: false }).is_none());
    }
}
