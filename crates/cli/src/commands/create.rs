use signoff_core::config::LoadOptions;

use crate::commands::{to_data, with_service, CommandResult};

pub fn run(options: LoadOptions, title: &str) -> CommandResult {
    if title.trim().is_empty() {
        return CommandResult::failure("create", "invalid_input", "title must not be empty", 6);
    }

    with_service("create", options, |service| async move {
        match service.create(title).await {
            Ok(contract) => match to_data("create", &contract.summary()) {
                Ok(data) => CommandResult::success_with_data(
                    "create",
                    format!("created contract {}", contract.id),
                    Some(data),
                ),
                Err(failure) => failure,
            },
            Err(error) => CommandResult::from_application_error("create", error),
        }
    })
}
