//! Slash commands typed into chat.

use crate::server::Server;

pub const NOT_OPERATOR: &str = "&cYou are not an operator!";
pub const UNKNOWN_COMMAND: &str = "&cUnknown command";

pub trait CommandHandler: Send + Sync {
    /// Handle one command line. `command` includes the leading `/`.
    fn process(&self, server: &Server, command: &str, is_operator: bool, issuer: &str);
}

/// The commands every server ships with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCommands;

impl CommandHandler for BuiltinCommands {
    fn process(&self, server: &Server, command: &str, is_operator: bool, issuer: &str) {
        let line = command.strip_prefix('/').unwrap_or(command).trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let target = rest.split(' ').next().unwrap_or("");
        tracing::info!("{} issued command: {}", issuer, command);

        let reply = |text: &str| server.tell(issuer, text);

        match verb.to_ascii_lowercase().as_str() {
            "help" => {
                reply("&eCommands: /help /list");
                if is_operator {
                    reply("&e/say /kick /ban /unban /op /deop /stop");
                }
            }
            "list" => {
                let names: Vec<String> = server
                    .registry()
                    .active_players()
                    .into_iter()
                    .map(|(_, p)| p.name)
                    .collect();
                reply(&format!("&ePlayers online: {}", names.join(", ")));
            }
            "say" | "kick" | "ban" | "unban" | "op" | "deop" | "stop" if !is_operator => {
                reply(NOT_OPERATOR);
            }
            "say" => server.announce(&format!("&d[{}] {}", issuer, rest)),
            "kick" | "ban" | "unban" | "op" | "deop" if target.is_empty() => {
                reply(&format!("&cUsage: /{} <player>", verb));
            }
            "kick" => match server.registry().find_by_name(target) {
                Some(session) => {
                    session.kick("&cYou were kicked by an operator");
                    server.announce(&format!("&e{} was kicked", target));
                }
                None => reply(&format!("&c{} is not online", target)),
            },
            "ban" => {
                server.bans().ban(target);
                if let Some(session) = server.registry().find_by_name(target) {
                    session.kick("&4You are banned!");
                }
                server.announce(&format!("&e{} was banned", target));
            }
            "unban" => {
                if server.bans().unban(target) {
                    reply(&format!("&e{} was unbanned", target));
                } else {
                    reply(&format!("&c{} is not banned", target));
                }
            }
            "op" => {
                server.ops().grant(target);
                if let Some(session) = server.registry().find_by_name(target) {
                    session.set_operator(true);
                    server.tell(target, "&eYou are now an operator");
                }
                reply(&format!("&e{} is now an operator", target));
            }
            "deop" => {
                server.ops().revoke(target);
                if let Some(session) = server.registry().find_by_name(target) {
                    session.set_operator(false);
                    server.tell(target, "&eYou are no longer an operator");
                }
                reply(&format!("&e{} is no longer an operator", target));
            }
            "stop" => server.request_stop("&cServer is shutting down"),
            _ => reply(UNKNOWN_COMMAND),
        }
    }
}
