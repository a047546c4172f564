//! Integration tests for per-slot candidate resolution, rendering and clicks.
mod common;

use common::{engine_from_json, host_with_player, materials};
use gridmenus::menu::ClickOutcome;
use gridmenus::sim::SimEconomy;
use serde_json::json;

fn some(m: &str) -> Option<String> {
    Some(m.to_string())
}

#[test]
fn lower_priority_wins_overlapping_ranges() {
    let mut engine = engine_from_json(&[(
        "main",
        json!({
            "rows": 1,
            "items": {
                "stone": {"slot": "0-2", "material": "stone", "priority": 1},
                "dirt": {"slot": 1, "material": "dirt", "priority": 0}
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(
        materials(&host, p, 4),
        vec![some("stone"), some("dirt"), some("stone"), None]
    );
}

#[test]
fn later_definition_wins_priority_ties() {
    let mut engine = engine_from_json(&[
        (
            "ties",
            json!({
                "rows": 1,
                "items": {
                    "first": {"slot": 0, "material": "stone", "priority": 2},
                    "second": {"slot": 0, "material": "dirt", "priority": 2}
                }
            }),
        ),
        (
            "ranked",
            json!({
                "rows": 1,
                "items": {
                    "low": {"slot": 0, "material": "stone", "priority": 5},
                    "high": {"slot": 0, "material": "dirt", "priority": 1},
                    "default": {"slot": 1, "material": "paper"},
                    "explicit": {"slot": 1, "material": "book", "priority": 9}
                }
            }),
        ),
    ]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "ties").unwrap();
    assert_eq!(materials(&host, p, 1), vec![some("dirt")]);

    engine.open_menu(&mut host, p, "ranked").unwrap();
    assert_eq!(materials(&host, p, 2), vec![some("dirt"), some("book")]);
}

#[test]
fn hidden_candidates_fall_through_and_report_denials() {
    let mut engine = engine_from_json(&[(
        "main",
        json!({
            "rows": 1,
            "items": {
                "vip": {
                    "slot": 4,
                    "priority": 1,
                    "material": "diamond",
                    "view_requirement": {
                        "requirements": {"rank": {"type": "has permission", "permission": "menus.vip"}},
                        "deny_actions": ["[message] not a vip yet"]
                    }
                },
                "locked": {"slot": 4, "material": "barrier"}
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(host.slot(p, 4).map(|i| i.material.as_str()), Some("barrier"));
    assert_eq!(host.messages_for(p), vec!["not a vip yet"]);

    host.grant_permission(p, "menus.vip");
    assert!(engine.refresh(&mut host, p));
    assert_eq!(host.slot(p, 4).map(|i| i.material.as_str()), Some("diamond"));
    assert_eq!(host.messages_for(p).len(), 1);
}

#[test]
fn filler_covers_empty_and_air_slots_only() {
    let mut engine = engine_from_json(&[(
        "main",
        json!({
            "rows": 1,
            "filler_item": {"material": "gray_stained_glass_pane", "slots": "0-8"},
            "items": {
                "title": {"slot": 0, "material": "paper", "display_name": "Info"},
                "ghost": {"slot": 2, "material": "unobtainium"},
                "secret": {
                    "slot": 4,
                    "material": "diamond",
                    "view_requirement": {
                        "requirements": {"p": {"type": "has permission", "permission": "secret"}}
                    }
                }
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();

    let pane = some("gray_stained_glass_pane");
    let mut expected = vec![pane.clone(); 9];
    expected[0] = some("paper");
    assert_eq!(materials(&host, p, 9), expected);
    assert_eq!(
        host.slot(p, 3).and_then(|i| i.custom_name.clone()).as_deref(),
        Some(" ")
    );
}

#[test]
fn clicks_re_resolve_the_visible_candidate() {
    let mut engine = engine_from_json(&[(
        "main",
        json!({
            "rows": 1,
            "items": {
                "vip": {
                    "slot": 0,
                    "priority": 1,
                    "material": "diamond",
                    "actions": ["[message] welcome to the lounge"],
                    "view_requirement": {
                        "requirements": {"rank": {"type": "has permission", "permission": "menus.vip"}}
                    }
                },
                "locked": {"slot": 0, "material": "barrier", "actions": "[message] members only"}
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    host.grant_permission(p, "menus.vip");
    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(host.slot(p, 0).map(|i| i.material.as_str()), Some("diamond"));

    host.revoke_permission(p, "menus.vip");
    let outcome = engine.handle_click(&mut host, p, 0);
    assert_eq!(
        outcome,
        ClickOutcome {
            cancelled: true,
            entry: Some("locked".into())
        }
    );
    assert_eq!(host.messages_for(p), vec!["members only"]);
}

#[test]
fn click_requirement_dispatches_success_or_deny() {
    let economy = SimEconomy::new();
    let mut engine = engine_from_json(&[(
        "shop",
        json!({
            "rows": 1,
            "items": {
                "kit": {
                    "slot": 0,
                    "material": "bread",
                    "click_requirement": {
                        "requirements": {
                            "funds": {
                                "type": "has money",
                                "amount": 10,
                                "deny_actions": ["[message] too poor"]
                            }
                        },
                        "success_actions": ["[message] paid"]
                    },
                    "success_actions": ["[takemoney] 10"]
                }
            }
        }),
    )])
    .with_economy(economy.clone());
    let (mut host, p) = host_with_player("Steve");
    economy.set_balance(p, 15.0);
    engine.open_menu(&mut host, p, "shop").unwrap();

    engine.handle_click(&mut host, p, 0);
    assert_eq!(economy.balance_of(p), 5.0);
    engine.handle_click(&mut host, p, 0);
    assert_eq!(economy.balance_of(p), 5.0);
    assert_eq!(host.messages_for(p), vec!["paid", "too poor"]);
}

#[test]
fn clicks_outside_a_menu_are_not_ours() {
    let mut engine = engine_from_json(&[("main", json!({"rows": 1}))]);
    let (mut host, p) = host_with_player("Steve");
    assert!(!engine.handle_click(&mut host, p, 0).cancelled);

    engine.open_menu(&mut host, p, "main").unwrap();
    let empty = engine.handle_click(&mut host, p, 3);
    assert!(empty.cancelled);
    assert_eq!(empty.entry, None);
}

#[test]
fn legacy_numeric_keys_and_structured_actions() {
    let mut engine = engine_from_json(&[(
        "legacy",
        json!({
            "rows": 1,
            "items": {
                "5": {"material": "compass", "action": {"type": "message", "value": "legacy hello"}},
                "99": {"material": "stone"}
            }
        }),
    )]);
    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "legacy").unwrap();
    assert_eq!(host.slot(p, 5).map(|i| i.material.as_str()), Some("compass"));
    assert_eq!(host.window(p).map(|w| w.slots.len()), Some(1));
    engine.handle_click(&mut host, p, 5);
    assert_eq!(host.messages_for(p), vec!["legacy hello"]);
}
