use dotenvy::dotenv;
use leetcode_coach::{
    extract_code, open_default_store, CoachApp, CoachAppOptions, Conversation, ConversationPhase,
    StructuredAnalysis, Theme, EXAMPLE_PROBLEMS, LANGUAGES,
};
use std::{
    env,
    error::Error,
    io::{self, Write},
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands:
  /new               start over
  /lang <language>   preferred language for code
  /translate <lang>  show the solution in another language
  /theme light|dark  switch theme
  /examples          list sample problems
  /exit              quit
Anything else is a problem to analyze, or a follow-up once analyzed.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut app = CoachApp::start(open_default_store(), CoachAppOptions::default()).await;
    if let Some(error) = app.api_key_error() {
        println!("{error}");
    }

    let mut env_key = env::var("GOOGLE_API_KEY").ok();
    while !app.is_configured() {
        let key = match env_key.take() {
            Some(key) => key,
            None => read_line("Gemini API key: ")?,
        };
        if key.is_empty() {
            return Err("an API key is required".into());
        }
        if app.submit_api_key(&key).await.is_err() {
            println!("{}", app.api_key_error().unwrap_or_default());
        }
    }

    println!("Theme: {}. Languages: {}.", app.theme(), LANGUAGES.join(", "));
    println!("{HELP}");

    loop {
        let input = read_line("> ")?;
        if input.is_empty() {
            continue;
        }

        let (command, argument) = input
            .split_once(' ')
            .map_or((input.as_str(), ""), |(command, argument)| {
                (command, argument.trim())
            });

        match command {
            "/exit" => break,
            "/new" => {
                app.conversation()?.new_chat().await;
                println!("Started a new conversation.");
            }
            "/lang" => {
                app.set_language(argument).await;
                println!("Preferred language: {argument}");
            }
            "/theme" => match argument.parse::<Theme>() {
                Ok(theme) => {
                    if let Err(error) = app.set_theme(theme).await {
                        println!("Theme applied but not saved: {error}");
                    }
                }
                Err(error) => println!("{error}"),
            },
            "/examples" => {
                for (name, statement) in EXAMPLE_PROBLEMS {
                    println!("{name}: {statement}");
                }
            }
            "/translate" => translate(app.conversation()?, argument).await,
            _ => {
                let conversation = app.conversation()?;
                if conversation.snapshot().await.phase == ConversationPhase::Empty {
                    analyze(conversation, &input).await;
                } else {
                    follow_up(conversation, &input).await?;
                }
            }
        }
    }

    Ok(())
}

async fn analyze(conversation: &Conversation, problem: &str) {
    println!("Analyzing...");
    match conversation.start_analysis(problem).await {
        Ok(analysis) => print_analysis(&analysis),
        Err(_) => print_error(conversation).await,
    }
}

/// Prints the answer as it streams in by watching the transcript. Only model
/// messages added after the question was sent are printed.
async fn follow_up(conversation: &Conversation, message: &str) -> io::Result<()> {
    let start = conversation.snapshot().await.messages.len();
    let task = tokio::spawn({
        let conversation = conversation.clone();
        let message = message.to_string();
        async move { conversation.send_follow_up(&message).await }
    });

    let mut printed = 0;
    loop {
        let snapshot = conversation.snapshot().await;
        if let Some(text) = snapshot
            .messages
            .iter()
            .skip(start)
            .rfind(|message| message.is_model())
            .and_then(|message| message.content.as_text())
        {
            if text.len() > printed {
                print!("{}", &text[printed..]);
                io::stdout().flush()?;
                printed = text.len();
            }
        }
        if task.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!();

    match task.await {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => print_error(conversation).await,
        Err(error) => println!("Follow-up task failed: {error}"),
    }
    Ok(())
}

async fn translate(conversation: &Conversation, language: &str) {
    let snapshot = conversation.snapshot().await;
    let Some(index) = snapshot
        .messages
        .iter()
        .position(|message| message.content.as_analysis().is_some())
    else {
        println!("Analyze a problem first.");
        return;
    };

    println!("Translating to {language}...");
    match conversation.translate_code(index, language).await {
        Ok(code) => print_code(&code),
        Err(_) => print_error(conversation).await,
    }
}

fn print_analysis(analysis: &StructuredAnalysis) {
    for (number, hint) in analysis.hints.iter().enumerate() {
        println!("Hint {}: {hint}", number + 1);
    }
    println!("\nAlgorithm:\n{}\n", analysis.algorithm);
    print_code(&analysis.code);
}

fn print_code(markdown: &str) {
    let block = extract_code(markdown);
    println!("Code ({}):\n{}", block.language, block.code);
}

async fn print_error(conversation: &Conversation) {
    if let Some(error) = conversation.snapshot().await.error {
        println!("{error}");
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
