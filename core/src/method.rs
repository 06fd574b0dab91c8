//! Remote method names exposed by the issuer.

use std::fmt;

/// Every remote procedure the issuer publishes for a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Balance,
    AllocateCard,
    LinkCard,
    LinkCardsBySequenceRange,
    DeductCardLoadProfile,
    LoadCardDeductProfile,
    TransferFunds,
    Register,
    UpdateProfile,
    Statement,
    StatementByDateRange,
    Activate,
    StopCard,
    UpdateAllocatedCard,
    Status,
    CancelStopCard,
    CheckAuthorisation,
    CheckLoad,
    CreateVirtualCard,
}

impl Method {
    pub const ALL: [Method; 19] = [
        Method::Balance,
        Method::AllocateCard,
        Method::LinkCard,
        Method::LinkCardsBySequenceRange,
        Method::DeductCardLoadProfile,
        Method::LoadCardDeductProfile,
        Method::TransferFunds,
        Method::Register,
        Method::UpdateProfile,
        Method::Statement,
        Method::StatementByDateRange,
        Method::Activate,
        Method::StopCard,
        Method::UpdateAllocatedCard,
        Method::Status,
        Method::CancelStopCard,
        Method::CheckAuthorisation,
        Method::CheckLoad,
        Method::CreateVirtualCard,
    ];

    /// Name of the remote procedure on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Method::Balance => "Balance",
            Method::AllocateCard => "AllocateCard",
            Method::LinkCard => "LinkCard",
            Method::LinkCardsBySequenceRange => "LinkCardsBySequenceRange",
            Method::DeductCardLoadProfile => "DeductCardLoadProfile",
            Method::LoadCardDeductProfile => "LoadCardDeductProfile",
            Method::TransferFunds => "TransferFunds",
            Method::Register => "Register",
            Method::UpdateProfile => "UpdateProfile",
            Method::Statement => "Statement",
            Method::StatementByDateRange => "StatementByDateRange",
            Method::Activate => "Activate",
            Method::StopCard => "StopCard",
            Method::UpdateAllocatedCard => "UpdateAllocatedCard",
            Method::Status => "Status",
            Method::CancelStopCard => "CancelStopCard",
            Method::CheckAuthorisation => "CheckAuthorisation",
            Method::CheckLoad => "CheckLoad",
            Method::CreateVirtualCard => "CreateVirtualCard",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Whether the argument layout of this method is known. Methods without
    /// one are refused before anything is sent.
    pub fn is_implemented(self) -> bool {
        !matches!(
            self,
            Method::LinkCardsBySequenceRange
                | Method::UpdateProfile
                | Method::StatementByDateRange
                | Method::Activate
                | Method::UpdateAllocatedCard
                | Method::Status
                | Method::CheckAuthorisation
                | Method::CheckLoad
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
