//! Publish command implementation.

use crate::cli::{Args, OutputManager};
use crate::error::Result;

/// Upload the bundle named in `args`, commit it and report the outcome
pub(super) async fn execute_publish(args: &Args, output: &OutputManager) -> Result<()> {
    let config = args.to_config();

    output.detail("Artifact", config.artifact_path.display());
    output.detail("Package", &config.package_name);
    output.detail("Credentials", config.credentials_path.display());
    output.step(&format!(
        "Publishing {} to {}",
        config.artifact_path.display(),
        config.package_name
    ));

    let outcome = crate::publish(&config).await?;

    output.bundle_uploaded(outcome.version_code, outcome.sha256.as_deref());
    output.edit_committed(&outcome.commit_id);
    output.edit_closed(&outcome.edit_id, &outcome.close);

    Ok(())
}
