//! Programmable transaction primitives

use crate::types::{ObjectId, SuiAddress};
use serde::{Deserialize, Serialize};

/// Typed pure argument; the wallet serializes it when signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PureValue {
    U64(u64),
    /// Move `vector<u8>`
    Bytes(Vec<u8>),
    Address(SuiAddress),
    /// Move `vector<address>`
    Addresses(Vec<SuiAddress>),
}

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// Object resolved to an owned/shared reference by the wallet
    Object(ObjectId),
    Pure(PureValue),
}

/// Reference to a value inside the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCall {
    pub package: String,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Argument>,
}

impl MoveCall {
    /// `package::module::function`
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveCall(MoveCall),
    SplitCoins(Argument, Vec<Argument>),
    TransferObjects(Vec<Argument>, Argument),
}

/// Ordered inputs and commands of one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl ProgrammableTransaction {
    /// Resolve an `Input` argument
    pub fn input(&self, argument: Argument) -> Option<&CallArg> {
        match argument {
            Argument::Input(index) => self.inputs.get(usize::from(index)),
            _ => None,
        }
    }

    pub fn move_calls(&self) -> impl Iterator<Item = &MoveCall> {
        self.commands.iter().filter_map(|command| match command {
            Command::MoveCall(call) => Some(call),
            _ => None,
        })
    }
}

/// Incremental builder; object inputs are de-duplicated
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    transaction: ProgrammableTransaction,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_input(&mut self, arg: CallArg) -> Argument {
        if let CallArg::Object(id) = &arg {
            let existing = self
                .transaction
                .inputs
                .iter()
                .position(|input| matches!(input, CallArg::Object(other) if other == id));
            if let Some(index) = existing {
                return Argument::Input(index as u16);
            }
        }
        self.transaction.inputs.push(arg);
        Argument::Input((self.transaction.inputs.len() - 1) as u16)
    }

    pub fn object(&mut self, id: ObjectId) -> Argument {
        self.push_input(CallArg::Object(id))
    }

    pub fn pure(&mut self, value: PureValue) -> Argument {
        self.push_input(CallArg::Pure(value))
    }

    fn command(&mut self, command: Command) -> Argument {
        self.transaction.commands.push(command);
        Argument::Result((self.transaction.commands.len() - 1) as u16)
    }

    /// Split one coin per amount; returns the first produced coin
    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<Argument>) -> Argument {
        match self.command(Command::SplitCoins(coin, amounts)) {
            Argument::Result(index) => Argument::NestedResult(index, 0),
            other => other,
        }
    }

    pub fn move_call(
        &mut self,
        package: &str,
        module: &str,
        function: &str,
        arguments: Vec<Argument>,
    ) -> Argument {
        self.command(Command::MoveCall(MoveCall {
            package: package.to_string(),
            module: module.to_string(),
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments,
        }))
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Argument) -> Argument {
        self.command(Command::TransferObjects(objects, recipient))
    }

    pub fn finish(self) -> ProgrammableTransaction {
        self.transaction
    }
}
