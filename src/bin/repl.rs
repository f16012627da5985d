use anyhow::Context;
use sheet_dice::notify::ToastQueue;
use sheet_dice::roll::MarkdownStringifier;
use sheet_dice::{CharacterSnapshot, DerivedStats, DiceConfig, LocalEngine, RollSession};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_dice=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = DiceConfig::from_env()?;
    let sheet = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading character sheet {}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing character sheet {}", path))?
        }
        None => CharacterSnapshot::default(),
    };

    let toasts = Arc::new(Mutex::new(ToastQueue::from_config(&config)));
    let engine = Arc::new(LocalEngine::new(config.max_rolls));
    let session = RollSession::new(engine, toasts.clone(), config);

    print!("> ");
    io::stdout().flush()?;
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line == ":stats" {
            let stats = DerivedStats::compute_with(&sheet, session.config());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else if !line.is_empty() {
            match session.roll_for(line, &sheet, None).await {
                Ok(Some(outcome)) => println!("{}", MarkdownStringifier::new().stringify(&outcome)),
                Ok(None) => {}
                Err(why) => eprintln!("Error: {}", why),
            }
        }

        let pending = toasts
            .lock()
            .map_err(|_| anyhow::anyhow!("toast queue poisoned"))?
            .drain();
        for toast in pending {
            eprintln!("[{}] {}", toast.kind, toast.message);
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}
