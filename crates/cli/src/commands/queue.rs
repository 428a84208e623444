use signoff_core::config::LoadOptions;

use crate::commands::{to_data, with_service, ActorArgs, CommandResult};

pub fn run(options: LoadOptions, actor: ActorArgs) -> CommandResult {
    let actor = actor.to_actor();

    with_service("queue", options, |service| async move {
        match service.work_queues(&actor).await {
            Ok(queues) => match to_data("queue", &queues) {
                Ok(data) => CommandResult::success_with_data(
                    "queue",
                    format!(
                        "{} awaiting, {} responded for {}",
                        queues.awaiting_count(),
                        queues.responded.len(),
                        actor.email
                    ),
                    Some(data),
                ),
                Err(failure) => failure,
            },
            Err(error) => CommandResult::from_application_error("queue", error),
        }
    })
}
