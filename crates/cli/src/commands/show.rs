use signoff_core::config::LoadOptions;
use signoff_core::ContractId;

use crate::commands::{to_data, with_service, CommandResult};

pub fn run(options: LoadOptions, contract_id: &str) -> CommandResult {
    let id = ContractId(contract_id.trim().to_owned());

    with_service("show", options, |service| async move {
        match service.contract(&id).await {
            Ok(contract) => match to_data("show", &contract) {
                Ok(data) => CommandResult::success_with_data(
                    "show",
                    format!("{} is {}", contract.id, contract.status),
                    Some(data),
                ),
                Err(failure) => failure,
            },
            Err(error) => CommandResult::from_application_error("show", error),
        }
    })
}
