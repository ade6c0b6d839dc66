//! Command execution: runs one publish and maps the result to an exit code.

mod publish;

use crate::cli::{Args, OutputManager};
use crate::error::{PublishError, Result};

use publish::execute_publish;

/// Execute the publish run described by `args`
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(e) = args.validate() {
        let error = PublishError::from(e);
        // Never quiet for rejected arguments
        OutputManager::new(false, false).invalid_arguments(&error);
        return Ok(error.exit_code());
    }

    let output = OutputManager::new(args.verbose, args.quiet);

    match execute_publish(&args, &output).await {
        Ok(()) => Ok(0),
        Err(e) => {
            output.failure(&e);
            Ok(e.exit_code())
        }
    }
}
