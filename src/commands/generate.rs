//! Generate static files

use anyhow::Result;

use crate::Spacetraveling;

/// Render the home page and the pre-rendered posts into the public directory
pub async fn run(app: &Spacetraveling) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = app.generator()?;
    let written = generator.generate(&app.public_dir, &app.static_dir).await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} pages into {:?} in {:.2}s",
        written,
        app.public_dir,
        duration.as_secs_f64()
    );

    Ok(())
}
