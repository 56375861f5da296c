use std::sync::Arc;

use bytes::Bytes;

use crate::{
    commands::{
        blpop::{BlpopArguments, blpop},
        command_error::CommandError,
        config_get::{ConfigGetArguments, config_get},
        echo::{EchoArguments, echo},
        get::{GetArguments, get},
        incr::{IncrArguments, incr},
        info::{InfoArguments, info},
        keys::{KeysArguments, keys},
        llen::{LlenArguments, llen},
        lpop::{LpopArguments, lpop},
        lrange::{LrangeArguments, lrange},
        ping::{PingArguments, ping, subscribed_ping},
        pub_sub::{
            PublishArguments, SubscribeArguments, UnsubscribeArguments, publish, subscribe,
            unsubscribe,
        },
        replication::{PsyncArguments, ReplconfArguments, WaitArguments, psync, replconf, wait},
        rpush_and_lpush::{PushArrayOperations, lpush, rpush},
        set::{SetArguments, set},
        transactions::{DiscardArguments, ExecArguments, MultiArguments},
        type_command::{TypeArguments, type_command},
        xadd::{XaddArguments, xadd},
        xrange::{XrangeArguments, xrange},
        xread::{XreadArguments, xread},
    },
    connection::{ClientContext, ClientOrigin},
    replication::WriteOrder,
    resp::{RespFrame, RespValue},
    server::RedisServer,
};

/// Commands that change the keyspace and are forwarded to replicas.
pub const WRITE_COMMANDS: [&str; 7] = ["SET", "INCR", "RPUSH", "LPUSH", "LPOP", "BLPOP", "XADD"];

/// Commands a connection in subscribed mode may still send.
pub const SUBSCRIBED_MODE_COMMANDS: [&str; 4] = ["SUBSCRIBE", "UNSUBSCRIBE", "PING", "QUIT"];

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    NoResponse,
    Response(RespValue),
    /// Several replies for one command, e.g. SUBSCRIBE with many channels.
    Responses(Vec<RespValue>),
    /// A reply plus the command bytes to forward to replicas.
    Write(RespValue, Bytes),
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    /// Upper-cased command name. `CONFIG GET` is kept as one name.
    pub name: String,
    pub arguments: Vec<String>,
    /// The bytes the command arrived as.
    pub raw: Bytes,
}

impl CommandHandler {
    pub fn new(frame: RespFrame) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = frame.value else {
            return Err(CommandError::InvalidCommand);
        };

        let mut words = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                RespValue::BulkString(s) => words.push(s),
                _ => return Err(CommandError::InvalidCommand),
            }
        }

        let mut words = words.into_iter();
        let Some(name) = words.next() else {
            return Err(CommandError::InvalidCommand);
        };
        let name = name.to_uppercase();

        let name = if name == "CONFIG" {
            let Some(sub_command) = words.next() else {
                return Err(CommandError::arity("config"));
            };

            if !sub_command.eq_ignore_ascii_case("GET") {
                return Err(CommandError::UnknownSubcommand(sub_command));
            }

            "CONFIG GET".to_string()
        } else {
            name
        };

        Ok(Self {
            name,
            arguments: words.collect(),
            raw: frame.raw,
        })
    }

    pub fn is_write(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    pub fn is_allowed_in_subscribed_mode(&self) -> bool {
        SUBSCRIBED_MODE_COMMANDS.contains(&self.name.as_str())
    }

    /// Checks the arguments without running the command. Used before queueing
    /// inside a transaction.
    pub fn validate_command_arguments(&self) -> Option<CommandError> {
        let arguments = self.arguments.clone();

        match self.name.as_str() {
            "PING" => PingArguments::parse(arguments).err(),
            "ECHO" => EchoArguments::parse(arguments).err(),
            "GET" => GetArguments::parse(arguments).err(),
            "SET" => SetArguments::parse(arguments).err(),
            "INCR" => IncrArguments::parse(arguments).err(),
            "KEYS" => KeysArguments::parse(arguments).err(),
            "TYPE" => TypeArguments::parse(arguments).err(),
            "RPUSH" => PushArrayOperations::parse(arguments, false).err(),
            "LPUSH" => PushArrayOperations::parse(arguments, true).err(),
            "LRANGE" => LrangeArguments::parse(arguments).err(),
            "LLEN" => LlenArguments::parse(arguments).err(),
            "LPOP" => LpopArguments::parse(arguments).err(),
            "BLPOP" => BlpopArguments::parse(arguments).err(),
            "XADD" => XaddArguments::parse(arguments).err(),
            "XRANGE" => XrangeArguments::parse(arguments).err(),
            "XREAD" => XreadArguments::parse(arguments).err(),
            "SUBSCRIBE" => SubscribeArguments::parse(arguments).err(),
            "UNSUBSCRIBE" => UnsubscribeArguments::parse(arguments).err(),
            "PUBLISH" => PublishArguments::parse(arguments).err(),
            "MULTI" => MultiArguments::parse(arguments).err(),
            "EXEC" => ExecArguments::parse(arguments).err(),
            "DISCARD" => DiscardArguments::parse(arguments).err(),
            "INFO" => InfoArguments::parse(arguments).err(),
            "CONFIG GET" => ConfigGetArguments::parse(arguments).err(),
            "REPLCONF" => ReplconfArguments::parse(arguments).err(),
            "PSYNC" => PsyncArguments::parse(arguments).err(),
            "WAIT" => WaitArguments::parse(arguments).err(),
            _ => Some(CommandError::UnknownCommand(self.name.to_lowercase())),
        }
    }

    /// Runs the command and forwards a client's write to the replicas before
    /// letting go of the write order. Writes from the leader are only applied.
    pub async fn execute(
        &self,
        server: &Arc<RedisServer>,
        context: &ClientContext,
    ) -> Result<CommandResult, CommandError> {
        let mut write_order = server.replication.write_order();
        // BLPOP takes it per attempt so it never waits while holding it
        if self.is_write() && self.name != "BLPOP" {
            write_order.acquire().await;
        }

        let result = self.handle_command(server, context, &mut write_order).await;

        match &result {
            Ok(CommandResult::Write(_, bytes)) if context.origin != ClientOrigin::Leader => {
                server.replication.propagate(bytes.clone()).await;
            }
            _ => {}
        }

        result
    }

    /// Runs the command. MULTI, EXEC, DISCARD and QUIT never get here; the
    /// dispatcher deals with them.
    async fn handle_command(
        &self,
        server: &Arc<RedisServer>,
        context: &ClientContext,
        write_order: &mut WriteOrder,
    ) -> Result<CommandResult, CommandError> {
        let store = Arc::clone(&server.store);
        let arguments = self.arguments.clone();

        match self.name.as_str() {
            "PING" => {
                let subscribed = store
                    .lock()
                    .await
                    .pub_sub
                    .is_subscribed(&context.client_address);

                if subscribed {
                    subscribed_ping(arguments)
                } else {
                    ping(arguments)
                }
            }
            "ECHO" => echo(arguments),
            "GET" => get(store, arguments).await,
            "SET" => set(store, arguments, &self.raw).await,
            "INCR" => incr(store, arguments, &self.raw).await,
            "KEYS" => keys(store, arguments).await,
            "TYPE" => type_command(store, arguments).await,
            "RPUSH" => rpush(store, arguments, &self.raw).await,
            "LPUSH" => lpush(store, arguments, &self.raw).await,
            "LRANGE" => lrange(store, arguments).await,
            "LLEN" => llen(store, arguments).await,
            "LPOP" => lpop(store, arguments, &self.raw).await,
            "BLPOP" => blpop(store, context, arguments, write_order).await,
            "XADD" => xadd(store, arguments, &self.raw).await,
            "XRANGE" => xrange(store, arguments).await,
            "XREAD" => xread(store, context, arguments).await,
            "SUBSCRIBE" => subscribe(store, context, arguments).await,
            "UNSUBSCRIBE" => unsubscribe(store, context, arguments).await,
            "PUBLISH" => publish(store, arguments).await,
            "INFO" => info(server, arguments).await,
            "CONFIG GET" => config_get(server, arguments).await,
            "REPLCONF" => replconf(server, context, arguments).await,
            "PSYNC" => psync(server, context, arguments).await,
            "WAIT" => wait(server, context, arguments).await,
            _ => Err(CommandError::UnknownCommand(self.name.to_lowercase())),
        }
    }
}
