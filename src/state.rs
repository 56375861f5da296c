use std::collections::HashMap;

use thiserror::Error;

use crate::commands::CommandHandler;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum StateError {
    #[error("transaction already started")]
    TransactionAlreadyStarted,
    #[error("transaction not found")]
    TransactionNotFound,
}

/// Open transactions, keyed by client address. A queue exists only between
/// MULTI and the matching EXEC/DISCARD (or disconnect).
#[derive(Debug, Default)]
pub struct State {
    transactions: HashMap<String, Vec<CommandHandler>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_transaction(&mut self, client_address: &str) -> Result<(), StateError> {
        if self.transactions.contains_key(client_address) {
            return Err(StateError::TransactionAlreadyStarted);
        }

        self.transactions
            .insert(client_address.to_string(), Vec::new());
        Ok(())
    }

    pub fn in_transaction(&self, client_address: &str) -> bool {
        self.transactions.contains_key(client_address)
    }

    pub fn add_to_transaction(
        &mut self,
        client_address: &str,
        command: CommandHandler,
    ) -> Result<(), StateError> {
        self.transactions
            .get_mut(client_address)
            .ok_or(StateError::TransactionNotFound)?
            .push(command);
        Ok(())
    }

    pub fn get_transaction(&self, client_address: &str) -> Option<&Vec<CommandHandler>> {
        self.transactions.get(client_address)
    }

    pub fn remove_transaction(&mut self, client_address: &str) -> Result<Vec<CommandHandler>, StateError> {
        self.transactions
            .remove(client_address)
            .ok_or(StateError::TransactionNotFound)
    }
}
