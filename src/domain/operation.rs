use crate::domain::Money;

/// One line of a batch file, addressed by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    SignUp { phone_number: String, email: String },
    Deposit { amount: Money },
    Transfer { recipient: String, amount: Money },
    Withdraw { amount: Money },
    Suspend,
    Reactivate,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::SignUp { .. } => "signup",
            OperationKind::Deposit { .. } => "deposit",
            OperationKind::Transfer { .. } => "transfer",
            OperationKind::Withdraw { .. } => "withdraw",
            OperationKind::Suspend => "suspend",
            OperationKind::Reactivate => "reactivate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub user: String,
    pub description: Option<String>,
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            OperationKind::Deposit { amount } | OperationKind::Withdraw { amount } => write!(
                f,
                "{},user={},amount={}",
                self.kind.name(),
                self.user,
                amount
            ),
            OperationKind::Transfer { recipient, amount } => write!(
                f,
                "transfer,user={},to={},amount={}",
                self.user, recipient, amount
            ),
            _ => write!(f, "{},user={}", self.kind.name(), self.user),
        }
    }
}
