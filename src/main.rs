use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use meal_plan_intake::config::SubmitConfig;
use meal_plan_intake::error::StepError;
use meal_plan_intake::intake::{
    AllergyDraft, Gender, HttpTransport, IdentityPatch, IntakeAggregator, IntakeStep, StepDriver,
};

type Input = Lines<BufReader<Stdin>>;

/// A line of user input, or a navigation command.
enum Answer {
    Text(String),
    Skip,
    Back,
    Quit,
}

async fn ask(lines: &mut Input, label: &str) -> Answer {
    eprint!("{label}: ");
    match lines.next_line().await {
        Ok(Some(line)) => match line.trim() {
            ":skip" => Answer::Skip,
            ":back" => Answer::Back,
            ":quit" => Answer::Quit,
            text => Answer::Text(text.to_string()),
        },
        Ok(None) => Answer::Quit, // EOF
        Err(e) => {
            tracing::error!("Error reading stdin: {}", e);
            Answer::Quit
        }
    }
}

/// Outcome of one screen.
enum Flow {
    Continue,
    Quit,
}

fn navigate(driver: &mut StepDriver, answer: &Answer) -> Option<Flow> {
    let result = match answer {
        Answer::Skip => driver.skip(),
        Answer::Back => driver.back(),
        Answer::Quit => return Some(Flow::Quit),
        Answer::Text(_) => return None,
    };
    if let Err(e) = result {
        eprintln!("   {e}");
    }
    Some(Flow::Continue)
}

/// Read one field; `Err` carries a navigation outcome.
async fn field(lines: &mut Input, driver: &mut StepDriver, label: &str) -> Result<String, Flow> {
    let answer = ask(lines, label).await;
    match navigate(driver, &answer) {
        Some(flow) => Err(flow),
        None => match answer {
            Answer::Text(text) => Ok(text),
            _ => Err(Flow::Continue),
        },
    }
}

async fn identity_screen(lines: &mut Input, driver: &mut StepDriver) -> Result<(), Flow> {
    let mut draft = driver.identity_draft().await;
    let name = field(lines, driver, &format!("Name [{}]", draft.name)).await?;
    if !name.is_empty() {
        draft.name = name;
    }
    let age = field(lines, driver, &format!("Age [{}]", draft.age)).await?;
    if !age.is_empty() {
        draft.age = age;
    }
    let gender = field(lines, driver, "Gender (male/female)").await?;
    match gender.to_ascii_lowercase().as_str() {
        "male" | "m" => draft.gender = Some(Gender::Male),
        "female" | "f" => draft.gender = Some(Gender::Female),
        _ => {}
    }
    report(driver.proceed_identity(&draft).await);
    Ok(())
}

async fn allergy_screen(lines: &mut Input, driver: &mut StepDriver) -> Result<(), Flow> {
    let current = driver.allergy_draft().await.normalized().join(", ");
    let line = field(lines, driver, &format!("Allergies, comma separated [{current}]")).await?;
    let draft = if line.is_empty() {
        AllergyDraft::from_line(&current)
    } else {
        AllergyDraft::from_line(&line)
    };
    report(driver.proceed_allergies(&draft).await);
    Ok(())
}

async fn metrics_screen(lines: &mut Input, driver: &mut StepDriver) -> Result<(), Flow> {
    let mut draft = driver.metrics_draft().await;
    for (label, slot) in [
        ("Current weight (kg)", &mut draft.current_weight),
        ("Height (cm)", &mut draft.height),
        ("Target weight (kg)", &mut draft.target_weight),
    ] {
        let value = field(lines, driver, &format!("{label} [{slot}]")).await?;
        if !value.is_empty() {
            *slot = value;
        }
    }
    let activity = field(lines, driver, "Activity level (low/medium/high)").await?;
    if let Ok(level) = activity.parse() {
        draft.activity = level;
    }
    report(driver.proceed_metrics(&draft).await);
    Ok(())
}

async fn review_screen(lines: &mut Input, driver: &mut StepDriver) -> Result<(), Flow> {
    let snapshot = driver.aggregator().snapshot().await;
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => eprintln!("{json}"),
        Err(e) => tracing::warn!("Failed to render snapshot: {}", e),
    }
    field(lines, driver, "Press Enter to submit").await?;
    match driver.finish().await {
        Ok(receipt) => {
            println!("{}", receipt.response);
        }
        Err(StepError::Submit(e)) => {
            eprintln!("   Submission failed ({}): {e}", e.kind());
            eprintln!("   Press Enter to retry, :back to edit, :quit to leave.");
        }
        Err(e) => eprintln!("   {e}"),
    }
    Ok(())
}

fn report(result: Result<IntakeStep, StepError>) {
    if let Err(e) = result {
        eprintln!("   {e}");
    }
}

#[tokio::main]
async fn main() -> meal_plan_intake::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SubmitConfig::from_env()?;
    let transport = Arc::new(HttpTransport::new(&config)?);
    let aggregator = IntakeAggregator::new(transport);

    eprintln!("🥗 Meal Plan Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.endpoint);
    eprintln!("   Commands: :skip  :back  :quit\n");

    // The auth provider reports the user token some time after start-up.
    match std::env::var("MEAL_PLAN_CLERK_USER_ID") {
        Ok(token) => {
            let aggregator = Arc::clone(&aggregator);
            tokio::spawn(async move {
                aggregator.update_identity(IdentityPatch::token(token)).await;
            });
        }
        Err(_) => {
            eprintln!("   Warning: MEAL_PLAN_CLERK_USER_ID not set; identity step cannot be completed")
        }
    }

    let mut driver = StepDriver::new(aggregator);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let step = driver.current();
        if step.is_terminal() {
            break;
        }
        eprintln!("\n── Step {}/4: {} ──", step.position(), step);
        let outcome = match step {
            IntakeStep::Identity => identity_screen(&mut lines, &mut driver).await,
            IntakeStep::Allergies => allergy_screen(&mut lines, &mut driver).await,
            IntakeStep::Metrics => metrics_screen(&mut lines, &mut driver).await,
            IntakeStep::Review => review_screen(&mut lines, &mut driver).await,
            IntakeStep::Submitted => break,
        };
        if let Err(Flow::Quit) = outcome {
            eprintln!("Leaving without submitting.");
            break;
        }
    }

    Ok(())
}
