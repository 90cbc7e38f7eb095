use clap::Parser;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use predict_core::core::dictionary::default_entries;
use predict_core::log_error;
use predict_core::logging::LOGGER;
use predict_core::model::{BigramScorer, VocabTokenizer};
use predict_core::learning::SelectionLearner;
use predict_core::persistence::{load_learning, save_dictionary, save_learning};
use predict_core::{CustomDictionary, EngineConfig, PredictionEngine, Suggestion, SuggestionSource};
use std::error::Error;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "predict_repl")]
#[command(about = "Interactive keyboard suggestion simulator")]
struct Args {
    /// Engine configuration (YAML); built-in defaults when absent
    #[arg(short, long, default_value = "config/engine.yaml")]
    config: PathBuf,

    /// Tokenizer piece vocabulary
    #[arg(short, long, default_value = "config/vocab.json")]
    vocab: PathBuf,

    /// Scoring model weights
    #[arg(short, long, default_value = "config/weights.json")]
    weights: PathBuf,

    /// Custom dictionary table; created on exit when missing
    #[arg(short, long, default_value = "config/custom_dictionary.json")]
    dictionary: PathBuf,

    /// Learned selection counts
    #[arg(long, default_value = "user_learning.bin")]
    learning: PathBuf,

    /// Active languages, comma separated
    #[arg(short, long, default_value = "en")]
    languages: String,

    /// Number of suggestions shown
    #[arg(short = 'n', long, default_value = "5")]
    top_n: usize,
}

struct Session {
    preedit: String,
    context: String,
    languages: Vec<String>,
    suggestions: Vec<Suggestion>,
    status: String,
}

impl Session {
    fn language_refs(&self) -> Vec<&str> {
        self.languages.iter().map(String::as_str).collect()
    }

    fn commit(&mut self, engine: &PredictionEngine<'_>, text: &str) {
        if let Err(e) = engine.record_selection(&self.context, text) {
            self.status = format!("not recorded: {}", e);
        } else {
            self.status = format!("committed '{}'", text);
        }
        self.context.push_str(text);
        self.context.push(' ');
        self.preedit.clear();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        EngineConfig::from_yaml_file(&args.config)?
    } else {
        EngineConfig::default()
    };
    config.apply_logging()?;
    if config.log_file.is_some() {
        LOGGER.set_stderr(false);
    }

    let tokenizer = VocabTokenizer::load(&args.vocab)?;
    let model = BigramScorer::load(&args.weights)?;

    let dictionary = CustomDictionary::with_budget(config.dictionary_reload_budget());
    if args.dictionary.exists() {
        dictionary.reload_from_file(&args.dictionary)?;
    } else {
        dictionary.reload(default_entries())?;
    }

    let learner = SelectionLearner::new();
    if args.learning.exists() {
        load_learning(&args.learning, &learner)?;
    }

    let engine = PredictionEngine::new(&config, &tokenizer, &model, dictionary)?.with_learner(learner);
    let mut session = Session {
        preedit: String::new(),
        context: String::new(),
        languages: args.languages.split(',').map(|l| l.trim().to_string()).collect(),
        suggestions: Vec::new(),
        status: String::new(),
    };

    loop {
        refresh(&engine, &mut session, args.top_n);
        print_ui(&session)?;

        let mut line = String::new();
        if stdin().read_line(&mut line)? == 0 {
            break;
        }
        let cmd = line.trim();

        match cmd {
            "exit" => break,
            "" => {
                // Enter commits the top suggestion, or the raw buffer.
                let to_commit = session
                    .suggestions
                    .first()
                    .map(|s| s.text.clone())
                    .unwrap_or_else(|| session.preedit.clone());
                if !to_commit.is_empty() {
                    session.commit(&engine, &to_commit);
                }
            }
            ":clear" => {
                session.context.clear();
                session.preedit.clear();
            }
            ":reload" => {
                session.status = match engine.dictionary().reload_from_file(&args.dictionary) {
                    Ok(()) => format!("dictionary reloaded: {} entries", engine.dictionary().len()),
                    Err(e) => {
                        log_error!("dictionary reload from {} failed: {}", args.dictionary.display(), e);
                        format!("reload failed: {}", e)
                    }
                };
            }
            s if s.starts_with(":add ") => {
                session.status = add_entry(&engine, &s[5..]);
            }
            s if s.starts_with(":rm ") => {
                engine.dictionary().remove(&s[4..]);
                session.status = format!("removed '{}'", s[4..].trim());
            }
            s if s.starts_with(":lang ") => {
                session.languages = s[6..].split(',').map(|l| l.trim().to_string()).collect();
            }
            s if s.starts_with(':') && s.len() > 1 => {
                if let Ok(n) = s[1..].parse::<usize>() {
                    if n > 0 && n <= session.suggestions.len() {
                        let chosen = session.suggestions[n - 1].text.clone();
                        session.commit(&engine, &chosen);
                    }
                }
            }
            s => session.preedit.push_str(s),
        }
    }

    save_dictionary(&args.dictionary, &engine.dictionary().entries())?;
    save_learning(&args.learning, engine.learner())?;
    println!("\nDictionary saved to '{}'", args.dictionary.display());
    Ok(())
}

/// Recomputes suggestions. A failed call keeps the previous list on screen.
fn refresh(engine: &PredictionEngine<'_>, session: &mut Session, top_n: usize) {
    let languages = session.language_refs();
    match engine.get_suggestions(&session.preedit, &languages, &session.context, top_n) {
        Ok(suggestions) => session.suggestions = suggestions,
        Err(e) => {
            log_error!("suggestions for {:?} failed: {}", session.preedit, e);
            session.status = format!("error: {}", e);
        }
    }
}

/// `key expansion words... [priority]`
fn add_entry(engine: &PredictionEngine<'_>, args: &str) -> String {
    let mut words: Vec<&str> = args.split_whitespace().collect();
    let priority = match words.last().and_then(|w| w.parse::<i64>().ok()) {
        Some(p) if words.len() > 2 => {
            words.pop();
            p
        }
        _ => 1,
    };
    let Some((key, expansion)) = words.split_first() else {
        return "usage: :add <key> <expansion> [priority]".to_string();
    };
    match engine.dictionary().add(key, &expansion.join(" "), priority) {
        Ok(()) => format!("added '{}' -> '{}'", key, expansion.join(" ")),
        Err(e) => format!("add failed: {}", e),
    }
}

fn print_ui(session: &Session) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    execute!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    println!("Keyboard Suggestion Simulator");
    println!("---------------------------------------------------------------");
    println!("Type and press [Enter] to commit, or type text to extend the buffer.");
    println!("Select with ':1', ':2'. ':add key text [prio]', ':rm key', ':lang en,ja',");
    println!("':reload', ':clear'. 'exit' to save and quit.\n");

    println!("Languages: {}", session.languages.join(", "));
    println!("Context:   {}", session.context);
    println!("\nInput: [{}]", session.preedit);

    if session.suggestions.is_empty() {
        println!("\nNo suggestions.");
    } else {
        println!("\nSuggestions:");
        for (i, suggestion) in session.suggestions.iter().enumerate() {
            let color = match suggestion.source {
                SuggestionSource::Dictionary => Color::Green,
                SuggestionSource::Model => Color::Cyan,
            };
            execute!(
                out,
                SetForegroundColor(color),
                Print(format!("  :{}: {}", i + 1, suggestion.text)),
                ResetColor,
                Print(format!(" ({:?}, score {:.2})\n", suggestion.source, suggestion.score))
            )?;
        }
    }
    if !session.status.is_empty() {
        println!("\n{}", session.status);
    }
    print!("\n> ");
    out.flush()?;
    Ok(())
}
