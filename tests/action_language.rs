//! Integration tests for the bracketed action language as run by menus.
mod common;

use common::{engine_from_json, engine_with, host_with_player};
use gridmenus::action::{ActionLine, ActionTag};
use gridmenus::host::{Experience, PlayerState};
use gridmenus::menu::{ItemEntry, MenuDefinition, OpenOutcome};
use gridmenus::requirement::{PredicateSpec, RequirementBlock};
use gridmenus::sim::SimEvent;
use serde_json::json;

#[test]
fn modifiers_are_stripped_from_the_argument() {
    let line = ActionLine::parse("[message]<delay=20> Hello <chance=50>world").unwrap();
    assert_eq!(line.tag, ActionTag::Message);
    assert_eq!(line.delay_ticks, 20);
    assert_eq!(line.chance, 50.0);
    assert_eq!(line.argument, "Hello world");
}

#[test]
fn delayed_lines_do_not_hold_up_later_ones() {
    let menu = MenuDefinition::new("main", 1).open_actions(&["[message] first <delay=5>", "[message] second"]);
    let mut engine = engine_with(vec![menu]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(host.messages_for(p), vec!["second"]);
    for _ in 0..4 {
        engine.tick(&mut host);
    }
    assert_eq!(host.messages_for(p), vec!["second"]);
    engine.tick(&mut host);
    assert_eq!(host.messages_for(p), vec!["second", "first"]);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn chance_gates_each_execution() {
    let menu = MenuDefinition::new("main", 1).item(ItemEntry::new("coin", 0usize, "gold_ingot").actions(&[
        "[message] never <chance=0>",
        "[message] always <chance=100>",
        "[message] sometimes <chance=50>",
    ]));
    let mut engine = engine_with(vec![menu]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    for _ in 0..200 {
        engine.handle_click(&mut host, p, 0);
    }
    let messages = host.messages_for(p);
    let count = |m: &str| messages.iter().filter(|x| x.as_str() == m).count();
    assert_eq!(count("never"), 0);
    assert_eq!(count("always"), 200);
    let sometimes = count("sometimes");
    assert!(sometimes > 0 && sometimes < 200, "sometimes ran {} times", sometimes);
}

#[test]
fn experience_levels_points_and_floor() {
    let menu = MenuDefinition::new("main", 1)
        .item(ItemEntry::new("give", 0usize, "emerald").actions(&["[giveexp] 5l", "[giveexp] 100"]))
        .item(ItemEntry::new("take", 1usize, "stone").actions(&["[takeexp] 5l"]));
    let mut engine = engine_with(vec![menu]);
    let (mut host, p) = host_with_player("Steve");
    host.set_experience(p, Experience { level: 2, total_points: Some(0) });
    engine.open_menu(&mut host, p, "main").unwrap();

    engine.handle_click(&mut host, p, 0);
    assert_eq!(host.experience(p), Some(Experience { level: 7, total_points: Some(100) }));
    engine.handle_click(&mut host, p, 1);
    assert_eq!(host.experience(p).map(|x| x.level), Some(2));
    engine.handle_click(&mut host, p, 1);
    assert_eq!(host.experience(p).map(|x| x.level), Some(0));
}

#[test]
fn opengui_respects_the_target_open_requirement() {
    let vip = MenuDefinition::new("vip", 1).title("VIP").open_requirement(
        RequirementBlock::new().predicate(
            "rank",
            PredicateSpec::new("has permission")
                .with("permission", "menus.vip")
                .with_deny(&["[message] no entry"]),
        ),
    );
    let main = MenuDefinition::new("main", 1)
        .item(ItemEntry::new("door", 0usize, "chest").actions(&["[opengui] vip"]))
        .item(ItemEntry::new("void", 1usize, "barrier").actions(&["[opengui] nowhere"]));
    let mut engine = engine_with(vec![main, vip]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();

    engine.handle_click(&mut host, p, 0);
    assert_eq!(host.messages_for(p), vec!["no entry"]);
    assert_eq!(engine.session(p).map(|s| s.menu.id.as_str()), Some("main"));

    engine.handle_click(&mut host, p, 1);
    assert_eq!(host.messages_for(p).last().map(String::as_str), Some("§cGUI 'nowhere' not found!"));

    host.grant_permission(p, "menus.vip");
    engine.handle_click(&mut host, p, 0);
    assert_eq!(engine.session(p).map(|s| s.menu.id.as_str()), Some("vip"));
    let state = engine.menu_state(p);
    assert_eq!(state.current.as_deref(), Some("vip"));
    assert_eq!(state.last.as_deref(), Some("main"));
    assert_eq!(host.window(p).map(|w| w.title.as_str()), Some("VIP"));
}

#[test]
fn close_verb_runs_close_actions_once() {
    let menu = MenuDefinition::new("main", 1)
        .close_actions(&["[message] bye"])
        .item(ItemEntry::new("exit", 8usize, "arrow").actions(&["[close]"]));
    let mut engine = engine_with(vec![menu]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    let window = host.window(p).map(|w| w.id).unwrap();
    engine.handle_click(&mut host, p, 8);
    // The host reports the window closing after the verb closed it.
    assert!(!engine.handle_close(&mut host, p, window));

    assert_eq!(host.messages_for(p), vec!["bye"]);
    assert!(engine.session(p).is_none());
    assert_eq!(host.window(p).map(|w| w.open), Some(false));
    assert!(host.events().contains(&SimEvent::WindowClosed(p)));
}

#[test]
fn close_actions_that_open_a_menu_keep_the_window() {
    let hub = MenuDefinition::new("hub", 1).close_actions(&["[opengui] exit"]);
    let exit = MenuDefinition::new("exit", 1)
        .title("Exit")
        .close_actions(&["[message] exit closed"])
        .item(ItemEntry::new("clock", 0usize, "clock").name("Now").update(true));
    let shop = MenuDefinition::new("shop", 1).title("Shop");
    let mut engine = engine_with(vec![hub, exit, shop]);
    let (mut host, p) = host_with_player("Steve");

    engine.open_menu(&mut host, p, "hub").unwrap();
    let outcome = engine.open_menu(&mut host, p, "shop").unwrap();
    assert_eq!(outcome, OpenOutcome::Redirected("exit".into()));
    assert_eq!(engine.session(p).map(|s| s.menu.id.as_str()), Some("exit"));
    assert_eq!(host.window(p).map(|w| w.title.as_str()), Some("Exit"));
    assert_eq!(engine.menu_state(p).last.as_deref(), Some("hub"));
    assert_eq!(engine.pending_tasks(), 1);

    let window = host.window(p).map(|w| w.id).unwrap();
    assert!(engine.handle_close(&mut host, p, window));
    assert_eq!(host.messages_for(p), vec!["exit closed"]);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn refresh_verb_repaints_in_place() {
    let mut engine = engine_from_json(&[(
        "main",
        json!({
            "rows": 1,
            "items": {
                "button": {"slot": 0, "material": "clock", "actions": ["[refresh]"]},
                "shiny": {
                    "slot": 1,
                    "priority": 1,
                    "material": "diamond",
                    "view_requirement": {"requirements": {"p": {"type": "has permission", "permission": "shiny"}}}
                },
                "plain": {"slot": 1, "material": "stone"}
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    let session = engine.session(p).map(|s| s.id);
    assert_eq!(host.slot(p, 1).map(|i| i.material.as_str()), Some("stone"));

    host.grant_permission(p, "shiny");
    engine.handle_click(&mut host, p, 0);
    assert_eq!(host.slot(p, 1).map(|i| i.material.as_str()), Some("diamond"));
    assert_eq!(engine.session(p).map(|s| s.id), session);
}

#[test]
fn chat_and_command_verbs_resolve_placeholders() {
    let menu = MenuDefinition::new("main", 1).title("Main").item(
        ItemEntry::new("say", 0usize, "paper").actions(&[
            "[chat] I am in %menus_opened_menu_name%",
            "[console] log %menus_opened_menu%",
            "[broadcast]",
        ]),
    );
    let mut engine = engine_with(vec![menu]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    engine.handle_click(&mut host, p, 0);
    assert!(host.events().contains(&SimEvent::Chat {
        player: p,
        text: "I am in Main".into()
    }));
    assert_eq!(host.commands().last().map(|(_, c)| c.as_str()), Some("log main"));
    assert!(!host.events().iter().any(|e| matches!(e, SimEvent::Broadcast(_))));
}
