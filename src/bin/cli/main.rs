use std::io::Write;

use clap::{Parser, Subcommand};

use senpai_lib::config::Config;
use senpai_lib::Tutor;

#[derive(Parser)]
#[command(name = "senpai-cli", about = "SenpAI Socratic tutor CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive tutoring chat (default)
    Chat {
        /// Resume an existing session
        #[arg(long)]
        session: Option<uuid::Uuid>,
    },

    /// List flashcard decks
    Decks,

    /// List flashcards, optionally within one deck
    Cards {
        #[arg(long)]
        deck: Option<i64>,
    },

    /// List cards due for review today
    Due,

    /// List quizzes
    Quizzes,

    /// List chat sessions
    Sessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let tutor = Tutor::new(&config)?;

    match cli.command {
        None | Some(Command::Chat { session: None }) => chat_loop(&tutor, None).await?,
        Some(Command::Chat { session }) => chat_loop(&tutor, session).await?,
        Some(Command::Decks) => {
            for deck in tutor.flashcards().list_decks()? {
                println!("{:>4}  {}  {}", deck.id, deck.name, deck.description);
            }
        }
        Some(Command::Cards { deck }) => {
            for card in tutor.flashcards().list_cards(deck)? {
                println!(
                    "{:>4}  [deck {}] {} -> {}",
                    card.id, card.deck_id, card.question, card.answer
                );
            }
        }
        Some(Command::Due) => {
            for card in tutor.flashcards().due_cards(None)? {
                println!("{:>4}  {}", card.id, card.question);
            }
        }
        Some(Command::Quizzes) => {
            for quiz in tutor.quizzes().list_quizzes()? {
                println!(
                    "{:>4}  {} ({:?}, {} min, {} questions)",
                    quiz.id,
                    quiz.title,
                    quiz.difficulty,
                    quiz.time,
                    quiz.questions.len()
                );
            }
        }
        Some(Command::Sessions) => {
            for summary in tutor.sessions().list_sessions()? {
                println!(
                    "{}  {}  ({} messages, updated {})",
                    summary.id,
                    summary.title,
                    summary.message_count,
                    summary.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}

async fn chat_loop(tutor: &Tutor, mut session: Option<uuid::Uuid>) -> anyhow::Result<()> {
    println!("SenpAI ready. Empty line to quit.");
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let (id, mut rx) = tutor.chat(session, message.to_string());
        session = Some(id);

        while let Some(segment) = rx.recv().await {
            print!("{}", segment);
            std::io::stdout().flush()?;
        }
        println!();
    }

    Ok(())
}
