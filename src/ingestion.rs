use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::traits::CommandStream;
use crate::domain::{Error, Money, Operation, OperationKind};

pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    kind: String,
    user: String,
    counterparty: Option<String>,
    amount: Option<Money>,
    description: Option<String>,
}

impl TryFrom<CsvRow> for Operation {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let user = row.user.trim().to_string();
        if user.is_empty() {
            return Err(Error::Ingestion("Missing user".to_string()));
        }
        let counterparty = row.counterparty.filter(|c| !c.trim().is_empty());
        let description = row.description.filter(|d| !d.trim().is_empty());

        let (kind, description) = match (
            row.kind.trim().to_ascii_lowercase().as_str(),
            counterparty,
            row.amount,
        ) {
            ("signup", Some(phone_number), None) => {
                let email = description.unwrap_or_else(|| format!("{}@wallet.local", user));
                (
                    OperationKind::SignUp {
                        phone_number,
                        email,
                    },
                    None,
                )
            }
            ("deposit", None, Some(amount)) => (OperationKind::Deposit { amount }, description),
            ("transfer", Some(recipient), Some(amount)) => (
                OperationKind::Transfer { recipient, amount },
                description,
            ),
            ("withdraw" | "withdrawal", None, Some(amount)) => {
                (OperationKind::Withdraw { amount }, description)
            }
            ("suspend", None, None) => (OperationKind::Suspend, None),
            ("reactivate", None, None) => (OperationKind::Reactivate, None),
            (other, _, _) => {
                return Err(Error::Ingestion(format!(
                    "Invalid operation: {} for user {}",
                    other, user
                )));
            }
        };

        Ok(Operation {
            kind,
            user,
            description,
        })
    }
}

impl<R: Read + Send + 'static> CommandStream for CsvReader<R> {
    type OpStream = Pin<Box<dyn Stream<Item = Result<Operation, Error>> + Send>>;

    fn stream(&mut self) -> Self::OpStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Operation, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Operation::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
