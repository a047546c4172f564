//! Running action lines against the engine.
//!
//! Every verb reports its own failures to the player and returns; one bad
//! line never stops the rest of the list.

use log::{debug, trace, warn};
use rand::Rng;

use super::parser::{ActionLine, ActionTag, ExpAmount, SoundArgs};
use crate::errors::MenuError;
use crate::host::{CommandActor, Host, PlayerId, Sound};
use crate::logutil::escape_log;
use crate::menu::engine::{MenuEngine, ScheduledJob};
use crate::requirement::parse_numeric;

/// Nesting limit for action lists that open menus whose actions open menus.
pub const MAX_ACTION_DEPTH: usize = 8;

const SOUND_USAGE: &str = "§c[sound] requires an identifier, e.g. random.pop";

impl MenuEngine {
    /// Parse and run `lines` in order for `player`.
    ///
    /// Lines with a delay are scheduled and do not hold up the ones after
    /// them. Blank and untagged lines are skipped.
    pub fn execute_actions(&mut self, host: &mut dyn Host, player: PlayerId, lines: &[String]) {
        if self.action_depth >= MAX_ACTION_DEPTH {
            warn!(
                "action nesting limit reached for {}, skipping {} line(s)",
                player,
                lines.len()
            );
            return;
        }
        self.action_depth += 1;
        for raw in lines {
            let Some(line) = ActionLine::parse(raw) else {
                if !raw.trim().is_empty() {
                    debug!("ignoring untagged action line '{}'", escape_log(raw));
                }
                continue;
            };
            if !self.roll_chance(line.chance) {
                trace!("{} skipped by chance {}", line.tag, line.chance);
                continue;
            }
            let argument = self.resolve_text(player, &line.argument);
            if line.delay_ticks > 0 {
                self.scheduler.schedule_delayed(
                    line.delay_ticks,
                    ScheduledJob::Action {
                        player,
                        tag: line.tag,
                        argument,
                    },
                );
                continue;
            }
            self.run_verb(host, player, &line.tag, &argument);
        }
        self.action_depth -= 1;
    }

    /// Chance 0 never passes, 100 always does; otherwise roll 0.00..=100.00.
    fn roll_chance(&mut self, chance: f64) -> bool {
        if chance >= 100.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        let roll = f64::from(self.rng.gen_range(0..=10_000u32)) / 100.0;
        roll <= chance
    }

    /// Run one verb with an already resolved argument.
    pub(crate) fn run_verb(&mut self, host: &mut dyn Host, player: PlayerId, tag: &ActionTag, arg: &str) {
        trace!("{} {} for {}", tag, escape_log(arg), player);
        match tag {
            ActionTag::Close => {
                self.close_session(host, player);
                // Close actions may have opened another menu in this window.
                if self.sessions.get(player).is_none() {
                    host.close_window(player);
                }
            }
            ActionTag::OpenGui => {
                if arg.is_empty() {
                    return;
                }
                match self.open_menu(host, player, arg) {
                    Ok(_) | Err(MenuError::Disabled) => {}
                    Err(MenuError::NotFound(_)) => {
                        host.send_message(player, &format!("§cGUI '{}' not found!", arg));
                    }
                    Err(e) => warn!("[opengui] {} failed: {}", escape_log(arg), e),
                }
            }
            ActionTag::Message => {
                if !arg.is_empty() {
                    host.send_message(player, arg);
                }
            }
            ActionTag::Broadcast => {
                if !arg.is_empty() {
                    host.broadcast(arg);
                }
            }
            ActionTag::Chat => {
                if !arg.is_empty() {
                    host.chat(player, arg);
                }
            }
            ActionTag::Console => {
                if !arg.is_empty() {
                    host.dispatch_command(CommandActor::Console, arg);
                }
            }
            ActionTag::Player => {
                if !arg.is_empty() {
                    host.dispatch_command(CommandActor::Player(player), arg);
                }
            }
            ActionTag::GivePermission | ActionTag::TakePermission => {
                if arg.is_empty() {
                    return;
                }
                let name = host.player_name(player).unwrap_or_default();
                match self.permissions.as_mut() {
                    None => host.send_message(player, "§cPermissions provider not available"),
                    Some(provider) if *tag == ActionTag::GivePermission => {
                        if !provider.grant(&name, arg) {
                            host.send_message(player, "§cFailed to add permission via provider.");
                        }
                    }
                    Some(provider) => {
                        provider.revoke(&name, arg);
                    }
                }
            }
            ActionTag::GiveMoney | ActionTag::TakeMoney => {
                let Some(amount) = parse_numeric(arg) else {
                    if !arg.is_empty() {
                        debug!("{} ignores non-numeric amount '{}'", tag, escape_log(arg));
                    }
                    return;
                };
                let Some(economy) = self.economy.as_mut() else {
                    host.send_message(player, "§cEconomy provider not available");
                    return;
                };
                let result = match tag {
                    ActionTag::GiveMoney if amount >= 0.0 => economy.deposit(player, amount),
                    _ => economy.withdraw(player, amount.abs()),
                };
                if let Err(e) = result {
                    host.send_message(player, &format!("§cEconomy error: {}", e));
                }
            }
            ActionTag::GiveExp | ActionTag::TakeExp => {
                let Some(amount) = ExpAmount::parse(arg) else { return };
                let take = *tag == ActionTag::TakeExp;
                let current = host.experience(player).unwrap_or_default();
                match amount {
                    ExpAmount::Levels(n) => {
                        let delta = if take { -n.abs() } else { n };
                        let level = (i64::from(current.level) + delta).clamp(0, i64::from(u32::MAX));
                        host.set_experience_level(player, level as u32);
                    }
                    ExpAmount::Points(n) if take => {
                        let mut n = n.abs();
                        if let Some(total) = current.total_points {
                            n = n.min(i64::try_from(total).unwrap_or(i64::MAX));
                        }
                        host.add_experience_points(player, -n);
                    }
                    ExpAmount::Points(n) => host.add_experience_points(player, n),
                }
            }
            ActionTag::Sound | ActionTag::BroadcastSound | ActionTag::BroadcastSoundWorld => {
                let Some(args) = SoundArgs::parse(arg) else {
                    host.send_message(player, SOUND_USAGE);
                    return;
                };
                let Some(origin) = host.location(player) else { return };
                let targets = match tag {
                    ActionTag::Sound => vec![player],
                    ActionTag::BroadcastSound => host.online_players(),
                    _ => host.players_in_world(&origin.world),
                };
                let sound = Sound {
                    id: args.id,
                    volume: args.volume,
                    pitch: args.pitch,
                    origin,
                };
                host.play_sound(&targets, &sound);
            }
            ActionTag::Refresh => {
                self.refresh(host, player);
            }
            ActionTag::Unknown(name) => {
                host.send_message(player, &format!("§cUnknown action tag: [{}]", name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::host::{Experience, PlayerState};
    use crate::menu::loader::LoadOptions;
    use crate::menu::MenuRegistry;
    use crate::sim::{SimEconomy, SimEvent, SimHost, SimPermissions};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (MenuEngine, SimHost, PlayerId) {
        let engine = MenuEngine::new(EngineConfig::default(), MenuRegistry::new(LoadOptions::default()))
            .with_seed(42);
        let mut host = SimHost::new();
        let player = host.add_player("Steve");
        (engine, host, player)
    }

    #[test]
    fn chat_verbs_and_unknown_tags() {
        let (mut engine, mut host, p) = setup();
        engine.execute_actions(
            &mut host,
            p,
            &lines(&["[message] hi", "[dance]", "plain text", "[broadcast] all", "[player] spawn", "[console] save-all"]),
        );
        assert_eq!(host.messages_for(p), vec!["hi", "§cUnknown action tag: [dance]"]);
        assert!(host.events().contains(&SimEvent::Broadcast("all".into())));
        assert_eq!(
            host.commands(),
            vec![
                (CommandActor::Player(p), "spawn".to_string()),
                (CommandActor::Console, "save-all".to_string())
            ]
        );
    }

    #[test]
    fn missing_providers_are_reported() {
        let (mut engine, mut host, p) = setup();
        engine.execute_actions(
            &mut host,
            p,
            &lines(&["[givemoney] 5", "[givemoney] lots", "[givepermission] fly", "[sound]"]),
        );
        assert_eq!(
            host.messages_for(p),
            vec![
                "§cEconomy provider not available",
                "§cPermissions provider not available",
                SOUND_USAGE
            ]
        );
    }

    #[test]
    fn money_moves_through_the_economy() {
        let (engine, mut host, p) = setup();
        let economy = SimEconomy::new();
        economy.set_balance(p, 10.0);
        let mut engine = engine.with_economy(economy.clone());
        engine.execute_actions(&mut host, p, &lines(&["[givemoney] 5", "[takemoney] -3", "[givemoney] -2"]));
        assert_eq!(economy.balance_of(p), 10.0);
        engine.execute_actions(&mut host, p, &lines(&["[takemoney] 100"]));
        assert_eq!(host.messages_for(p), vec!["§cEconomy error: insufficient funds"]);
    }

    #[test]
    fn permissions_go_to_the_provider_by_name() {
        let (engine, mut host, p) = setup();
        let perms = SimPermissions::new();
        let mut engine = engine.with_permissions(perms.clone());
        engine.execute_actions(&mut host, p, &lines(&["[givepermission] kit.vip"]));
        assert!(perms.has("steve", "kit.vip"));
        engine.execute_actions(&mut host, p, &lines(&["[takepermission] kit.vip"]));
        assert!(!perms.has("Steve", "kit.vip"));

        let mut refusing = MenuEngine::new(EngineConfig::default(), MenuRegistry::new(LoadOptions::default()))
            .with_permissions(SimPermissions::refusing());
        refusing.execute_actions(&mut host, p, &lines(&["[givepermission] kit.vip"]));
        assert_eq!(host.messages_for(p), vec!["§cFailed to add permission via provider."]);
    }

    #[test]
    fn experience_levels_and_points() {
        let (mut engine, mut host, p) = setup();
        host.set_experience(p, Experience { level: 3, total_points: Some(40) });
        engine.execute_actions(&mut host, p, &lines(&["[giveexp] 5l", "[giveexp] 100"]));
        assert_eq!(host.experience(p), Some(Experience { level: 8, total_points: Some(140) }));
        engine.execute_actions(&mut host, p, &lines(&["[takeexp] 20l", "[takeexp] -500"]));
        assert_eq!(host.experience(p), Some(Experience { level: 0, total_points: Some(0) }));
    }

    #[test]
    fn sounds_pick_their_audience() {
        let (mut engine, mut host, p) = setup();
        let q = host.add_player("Alex");
        let r = host.add_player("Sam");
        host.add_world("nether");
        host.set_location(r, crate::host::Location::new("nether", 0.0, 0.0, 0.0));
        engine.execute_actions(
            &mut host,
            p,
            &lines(&["[sound] random.pop 0.5", "[broadcastsound] note.bass", "[broadcastsoundworld] note.harp 1 2"]),
        );
        let sounds: Vec<(Vec<PlayerId>, String, f32, f32)> = host
            .events()
            .iter()
            .filter_map(|e| match e {
                SimEvent::Sound { targets, sound } => {
                    let mut t = targets.clone();
                    t.sort();
                    Some((t, sound.id.clone(), sound.volume, sound.pitch))
                }
                _ => None,
            })
            .collect();
        let mut everyone = vec![p, q, r];
        everyone.sort();
        let mut overworld = vec![p, q];
        overworld.sort();
        assert_eq!(
            sounds,
            vec![
                (vec![p], "random.pop".to_string(), 0.5, 1.0),
                (everyone, "note.bass".to_string(), 1.0, 1.0),
                (overworld, "note.harp".to_string(), 1.0, 2.0),
            ]
        );
    }

    #[test]
    fn delayed_lines_wait_for_ticks_and_chance_bounds_hold() {
        let (mut engine, mut host, p) = setup();
        engine.execute_actions(&mut host, p, &lines(&["[message] later <delay=2>", "[message] now"]));
        assert_eq!(host.messages_for(p), vec!["now"]);
        engine.tick(&mut host);
        assert_eq!(host.messages_for(p).len(), 1);
        engine.tick(&mut host);
        assert_eq!(host.messages_for(p), vec!["now", "later"]);

        let mut host = SimHost::new();
        let p = host.add_player("Steve");
        let never = lines(&["[message] never <chance=0>"]);
        let always = lines(&["[message] always <chance=100>"]);
        for _ in 0..200 {
            engine.execute_actions(&mut host, p, &never);
            engine.execute_actions(&mut host, p, &always);
        }
        let messages = host.messages_for(p);
        assert_eq!(messages.len(), 200);
        assert!(messages.iter().all(|m| m == "always"));
    }

    #[test]
    fn delayed_lines_are_dropped_for_offline_players() {
        let (mut engine, mut host, p) = setup();
        engine.execute_actions(&mut host, p, &lines(&["[message] later <delay=1>"]));
        host.disconnect(p);
        engine.tick(&mut host);
        assert!(host.messages_for(p).is_empty());
    }
}
