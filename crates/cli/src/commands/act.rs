use clap::{Args, Subcommand};
use serde::Serialize;
use signoff_core::config::LoadOptions;
use signoff_core::workflow::TeamMember;
use signoff_core::{
    ActionOutcome, ActionRequest, AmendmentStage, ApproverRole, ContractId, ContractStatus,
    DispatchReport, TimelineNote, WorkflowAction,
};

use crate::commands::{to_data, with_service, ActorArgs, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ActArgs {
    #[arg(long, help = "Contract identifier")]
    pub contract: String,
    #[command(flatten)]
    pub actor: ActorArgs,
    #[arg(long, help = "Replace the timeline entry details")]
    pub note: Option<String>,
    #[arg(long, help = "Replace the timeline entry action label")]
    pub label: Option<String>,
    #[command(subcommand)]
    pub action: ActionCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ActionCommand {
    #[command(about = "Add a team member to a role slot (admin)")]
    Assign {
        #[arg(long, value_parser = parse_role)]
        role: ApproverRole,
        #[arg(long, help = "Email of the member to assign")]
        email: String,
        #[arg(long, help = "Display name of the member to assign")]
        name: Option<String>,
    },
    #[command(about = "Remove a team member from a role slot (admin)")]
    Remove {
        #[arg(long, value_parser = parse_role)]
        role: ApproverRole,
        #[arg(long, help = "Email of the member to remove")]
        email: String,
    },
    #[command(about = "Approve as the acting member of the role")]
    Approve {
        #[arg(long, value_parser = parse_role)]
        role: ApproverRole,
    },
    #[command(about = "Send the contract back for revision")]
    SendBack {
        #[arg(long, value_parser = parse_role)]
        role: ApproverRole,
    },
    #[command(about = "Withdraw an earlier approval or send-back")]
    Withdraw {
        #[arg(long, value_parser = parse_role)]
        role: ApproverRole,
    },
    #[command(about = "Open an amendment on a signed contract (admin)")]
    StartAmendment,
    #[command(about = "Close the amendment and restore the pre-amendment status (admin)")]
    CompleteAmendment,
    #[command(about = "Move an out-of-review contract to its next lifecycle status (admin)")]
    Advance {
        #[arg(long, value_parser = parse_status)]
        to: ContractStatus,
    },
}

impl ActionCommand {
    pub fn into_action(self) -> WorkflowAction {
        match self {
            Self::Assign { role, email, name } => {
                let name = name.unwrap_or_else(|| email.clone());
                WorkflowAction::Assign { role, member: TeamMember::new(email, name) }
            }
            Self::Remove { role, email } => WorkflowAction::Remove { role, email },
            Self::Approve { role } => WorkflowAction::Approve { role },
            Self::SendBack { role } => WorkflowAction::SendBack { role },
            Self::Withdraw { role } => WorkflowAction::Withdraw { role },
            Self::StartAmendment => WorkflowAction::StartAmendment,
            Self::CompleteAmendment => WorkflowAction::CompleteAmendment,
            Self::Advance { to } => WorkflowAction::Advance { to },
        }
    }
}

fn parse_role(value: &str) -> Result<ApproverRole, String> {
    ApproverRole::parse(value)
        .ok_or_else(|| format!("unknown role `{value}` (expected legal|management|approver)"))
}

fn parse_status(value: &str) -> Result<ContractStatus, String> {
    ContractStatus::parse(value).ok_or_else(|| format!("unknown contract status `{value}`"))
}

#[derive(Debug, Serialize)]
struct ActReport<'a> {
    correlation_id: &'a str,
    contract_id: &'a ContractId,
    status: ContractStatus,
    amendment_stage: Option<AmendmentStage>,
    version: u32,
    refreshed: bool,
    outcome: &'a ActionOutcome,
    notifications: &'a DispatchReport,
}

pub fn run(options: LoadOptions, args: ActArgs) -> CommandResult {
    let id = ContractId(args.contract.trim().to_owned());
    let actor = args.actor.to_actor();
    let mut request = ActionRequest::new(args.action.into_action());
    if args.note.is_some() || args.label.is_some() {
        request = request.with_note(TimelineNote { action: args.label, details: args.note });
    }

    with_service("act", options, |service| async move {
        let response = match service.execute(&id, &actor, &request).await {
            Ok(response) => response,
            Err(error) => return CommandResult::from_application_error("act", error),
        };

        let message = match &response.outcome {
            ActionOutcome::Applied(patch) => format!(
                "{} applied to {} ({} -> {})",
                request.action.name(),
                response.contract.id,
                patch.previous_status,
                patch.status
            ),
            ActionOutcome::Ignored(reason) => {
                format!("{} ignored: {}", request.action.name(), reason.reason())
            }
        };

        let report = ActReport {
            correlation_id: &response.correlation_id,
            contract_id: &response.contract.id,
            status: response.contract.status,
            amendment_stage: response.contract.amendment_stage,
            version: response.contract.version,
            refreshed: response.refreshed,
            outcome: &response.outcome,
            notifications: &response.notifications,
        };
        match to_data("act", &report) {
            Ok(data) => CommandResult::success_with_data("act", message, Some(data)),
            Err(failure) => failure,
        }
    })
}
