//! Integration tests for requirement blocks evaluated through the engine.
mod common;

use common::{engine_with, host_with_player, materials};
use gridmenus::host::{Experience, ItemStack, Location};
use gridmenus::menu::{ItemEntry, MenuDefinition, MenuEngine};
use gridmenus::requirement::{EvalContext, PredicateSpec, RequirementBlock};
use gridmenus::sim::{SimEconomy, SimHost};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn perm(p: &str) -> PredicateSpec {
    PredicateSpec::new("has permission").with("permission", p)
}

fn setup() -> (MenuEngine, SimHost, gridmenus::host::PlayerId) {
    let engine = engine_with(Vec::new());
    let (host, p) = host_with_player("Steve");
    (engine, host, p)
}

#[test]
fn empty_block_passes() {
    let (engine, host, p) = setup();
    let eval = engine.evaluate_requirements(&host, p, &RequirementBlock::new());
    assert!(eval.passed);
    assert!(eval.results.is_empty());
}

#[test]
fn minimum_counts_passes_and_stop_at_success_skips_the_rest() {
    let (engine, mut host, p) = setup();
    host.grant_permission(p, "a");
    host.grant_permission(p, "c");
    let block = RequirementBlock::new()
        .predicate("a", perm("a"))
        .predicate("b", perm("b"))
        .predicate("c", perm("c"))
        .predicate("d", perm("d"))
        .minimum(2);
    let eval = engine.evaluate_requirements(&host, p, &block);
    assert!(eval.passed);
    assert_eq!(eval.results.len(), 4);

    let eval = engine.evaluate_requirements(&host, p, &block.clone().stop_at_success(true));
    assert!(eval.passed);
    assert_eq!(eval.results.len(), 3);
    assert!(eval.result("d").is_none());

    let strict = RequirementBlock::new().predicate("a", perm("a")).predicate("b", perm("b"));
    assert!(!engine.evaluate_requirements(&host, p, &strict).passed);
}

#[test]
fn negation_inverts_every_predicate() {
    let (engine, mut host, p) = setup();
    host.grant_permission(p, "fly");
    for permission in ["fly", "swim"] {
        let plain = RequirementBlock::new().predicate("x", perm(permission));
        let mut negated_spec = perm(permission);
        negated_spec.kind = "!has permission".into();
        let negated = RequirementBlock::new().predicate("x", negated_spec);
        assert_ne!(
            engine.evaluate_requirements(&host, p, &plain).passed,
            engine.evaluate_requirements(&host, p, &negated).passed
        );
    }
}

#[test]
fn player_state_predicates() {
    let economy = SimEconomy::new();
    let engine = engine_with(Vec::new()).with_economy(economy.clone());
    let (mut host, p) = host_with_player("Steve");
    economy.set_balance(p, 25.0);
    host.set_experience(p, Experience { level: 4, total_points: None });
    host.give_item(p, ItemStack::new("arrow", 10));
    host.give_item(p, ItemStack::new("arrow", 10));
    host.set_location(p, Location::new("world", 10.0, 64.0, 0.0));

    let check = |spec: PredicateSpec| {
        engine
            .evaluate_requirements(&host, p, &RequirementBlock::new().predicate("x", spec))
            .passed
    };
    assert!(check(PredicateSpec::new("has money").with("amount", 25)));
    assert!(!check(PredicateSpec::new("has money").with("amount", 25.5)));
    assert!(check(PredicateSpec::new("has item").with("material", "arrow").with("amount", 20)));
    assert!(!check(PredicateSpec::new("has item").with("material", "arrow").with("amount", 21)));
    assert!(check(PredicateSpec::new("has exp").with("amount", 4).with("level", true)));
    // Without exact totals, levels are approximated at 100 points each.
    assert!(check(PredicateSpec::new("has exp").with("amount", 400)));
    assert!(!check(PredicateSpec::new("has exp").with("amount", 401)));
    assert!(check(
        PredicateSpec::new("is near")
            .with("location", "world,0,64,0")
            .with("distance", 10)
    ));
    assert!(!check(
        PredicateSpec::new("is near")
            .with("location", "nether,0,64,0")
            .with("distance", 100)
    ));
}

#[test]
fn expressions_are_evaluated_without_a_script_engine() {
    let (engine, host, p) = setup();
    let check = |expr: &str| {
        engine
            .evaluate_requirements(
                &host,
                p,
                &RequirementBlock::new().predicate("x", PredicateSpec::new("javascript").with("expression", expr)),
            )
            .passed
    };
    assert!(check("(2 + 3) * 4 >= 20 && 7 % 4 == 3"));
    assert!(!check("1 > 2 || 3 < 1"));
    assert!(!check("1 === 1"));
    assert!(!check("process.exit()"));
}

#[test]
fn string_predicates_resolve_menu_state() {
    let (engine, host, p) = setup();
    let check = |kind: &str, input: &str, output: &str| {
        engine
            .evaluate_requirements(
                &host,
                p,
                &RequirementBlock::new().predicate(
                    "x",
                    PredicateSpec::new(kind).with("input", input).with("output", output),
                ),
            )
            .passed
    };
    assert!(check("string equals", "%menus_is_in_menu%", "no"));
    assert!(check("string equals ignorecase", "ABC", "abc"));
    assert!(check("string contains", "hello world", "lo w"));
    assert!(check(">=", "10", "9"));
    assert!(!check(">", "9", "10"));
}

#[test]
fn predicates_registered_on_the_engine_gate_menus() {
    let raining = Arc::new(AtomicBool::new(false));
    let menu = MenuDefinition::new("main", 1)
        .item(
            ItemEntry::new("umbrella", 0usize, "paper")
                .priority(0)
                .view_requirement(RequirementBlock::new().predicate("sky", PredicateSpec::new("is raining"))),
        )
        .item(ItemEntry::new("sun", 0usize, "diamond").priority(1))
        .item(
            ItemEntry::new("door", 1usize, "barrier")
                .click_requirement(RequirementBlock::new().predicate("key", perm("menus.door")))
                .success_actions(&["[message] door opened"]),
        );
    let mut engine = engine_with(vec![menu]);
    let sky = raining.clone();
    engine
        .predicates_mut()
        .register("Is Raining", move |_: &EvalContext<'_>, _: &PredicateSpec| sky.load(Ordering::SeqCst));
    // Replaces the built-in permission check: every `menus.` node is public.
    engine
        .predicates_mut()
        .register("has permission", |_: &EvalContext<'_>, spec: &PredicateSpec| {
            spec.str_param("permission")
                .is_some_and(|node| node.starts_with("menus."))
        });

    let (mut host, p) = host_with_player("Steve");
    engine.open_menu(&mut host, p, "main").unwrap();
    assert_eq!(
        materials(&host, p, 2),
        vec![Some("diamond".to_string()), Some("barrier".to_string())]
    );

    raining.store(true, Ordering::SeqCst);
    assert!(engine.refresh(&mut host, p));
    assert_eq!(materials(&host, p, 1), vec![Some("paper".to_string())]);

    // The player holds no permissions; the registered handler still lets the click through.
    engine.handle_click(&mut host, p, 1);
    assert_eq!(host.messages_for(p), vec!["door opened"]);
}
