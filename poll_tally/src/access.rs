use log::debug;
use snafu::prelude::*;

use crate::config::*;
use crate::poll::Poll;

/// Who is asking, and on behalf of what.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub caller: &'a Identity,
    /// The owner of the registry.
    pub owner: &'a Identity,
    /// The creator of the poll the operation targets, if any.
    pub creator: Option<&'a Identity>,
    /// The voter the operation is about, for voter-scoped reads.
    pub voter: Option<&'a Identity>,
}

/// Stateless policy deciding whether a caller may run an operation.
pub struct AccessController;

impl AccessController {
    pub fn authorize(required: Access, req: &AccessRequest) -> PollResult<Role> {
        let is_creator = req.creator == Some(req.caller);
        let role = match required {
            Access::Anyone => Some(Role::Anyone),
            Access::OwnerOnly if req.caller == req.owner => Some(Role::Owner),
            Access::CreatorOnly if is_creator => Some(Role::Creator),
            Access::CreatorOrVoter if is_creator => Some(Role::Creator),
            Access::CreatorOrVoter if req.voter == Some(req.caller) => Some(Role::Voter),
            _ => None,
        };
        debug!(
            "authorize: {} requires {:?} -> {:?}",
            req.caller, required, role
        );
        role.context(UnauthorizedSnafu {
            caller: req.caller.clone(),
            required,
        })
    }

    /// Creator-or-voter check for reads about `voter` in `poll`. When
    /// `require_record` is set, the voter must also have voted.
    pub fn authorize_voter_read(
        poll: &Poll,
        owner: &Identity,
        caller: &Identity,
        voter: &Identity,
        require_record: bool,
    ) -> PollResult<Role> {
        let role = AccessController::authorize(
            Access::CreatorOrVoter,
            &AccessRequest {
                caller,
                owner,
                creator: Some(poll.creator()),
                voter: Some(voter),
            },
        )?;
        if require_record {
            ensure!(
                poll.ballots().did_vote(voter),
                VoterNotFoundSnafu {
                    id: poll.id().clone(),
                    voter: voter.clone()
                }
            );
        }
        Ok(role)
    }
}
