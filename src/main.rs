use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use field_dispatch::classifier::IntentClassifier;
use field_dispatch::config::DispatchConfig;
use field_dispatch::lifecycle::{LifecycleMachine, TaskStatus, TransitionContext, Trigger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = DispatchConfig::from_env()?;
    let machine = LifecycleMachine::new(&config);
    let classifier = IntentClassifier::default_rules();

    // Optional: simulate a task starting from this status.
    let mut status: Option<TaskStatus> = match std::env::var("FIELD_DISPATCH_STATUS") {
        Ok(raw) => Some(raw.parse().map_err(anyhow::Error::msg)?),
        Err(_) => None,
    };

    eprintln!("📨 field-dispatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Confidence threshold: {}, escalation after {}",
        config.confidence_threshold, config.escalation_threshold
    );
    if let Some(status) = status {
        eprintln!("   Simulating task from {status}");
    }
    eprintln!("   Type a reply and press Enter. Ctrl-D to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = classifier.classify(line);
        println!("{}", serde_json::to_string(&parsed)?);

        let (Some(current), Some(trigger)) = (status, Trigger::from_action(parsed.action)) else {
            continue;
        };
        let ctx = TransitionContext::new()
            .with_confidence(parsed.confidence)
            .at(Utc::now());
        let transition = machine.next_status(current, trigger, &ctx);
        println!("{}", serde_json::to_string(&transition)?);
        status = Some(transition.status);
    }

    Ok(())
}
