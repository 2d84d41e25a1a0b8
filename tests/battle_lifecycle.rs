//! Registry behaviour: exclusivity, accept races, expiry and fault isolation.

mod common;

use std::time::Duration;

use battlebot::battle::{
    BattleOutcome, EquipmentSlot, GameError, ItemCatalog, ItemEffectEmitter, ItemType, PlayerItem,
    Target, Trigger, TriggerEvent,
};
use common::*;

#[tokio::test]
async fn players_are_in_one_battle_at_a_time() {
    let f = fixed_game(vec![
        player("a", "Alice", 10),
        player("b", "Bob", 10),
        player("c", "Cid", 10),
    ]);
    f.game
        .request_battle("arena", ("a", "Alice"), ("b", "Bob"), None)
        .await
        .unwrap();

    for (x, y) in [(("c", "Cid"), ("a", "Alice")), (("b", "Bob"), ("c", "Cid"))] {
        assert!(matches!(
            f.game.request_battle("arena", x, y, None).await,
            Err(GameError::AlreadyInBattle(_))
        ));
    }

    f.game.accept_battle("b").await.unwrap().await.unwrap();
    // finished battles release their players
    f.game
        .request_battle("arena", ("c", "Cid"), ("a", "Alice"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn double_accept_runs_the_battle_once() {
    let f = fixed_game(vec![player("a", "Alice", 10), player("b", "Bob", 10)]);
    f.game
        .request_battle("arena", ("a", "Alice"), ("b", "Bob"), Some(1))
        .await
        .unwrap();

    let first = f.game.accept_battle("b").await.unwrap();
    let second = f.game.accept_battle("b").await;
    let mut outcomes = vec![first.await.unwrap()];
    if let Ok(task) = second {
        outcomes.push(task.await.unwrap());
    }

    let decided = outcomes
        .iter()
        .filter(|o| matches!(o, Some(BattleOutcome::Decided { .. })))
        .count();
    assert_eq!(decided, 1);
    let a = f.game.roster().get("a").await.unwrap().snapshot().await;
    let b = f.game.roster().get("b").await.unwrap().snapshot().await;
    assert_eq!(a.wins + b.wins, 1);
    assert_eq!(a.money + b.money, 20);
}

#[tokio::test(start_paused = true)]
async fn unaccepted_battle_expires_once() {
    let f = fixed_game(vec![player("a", "Alice", 10), player("b", "Bob", 10)]);
    f.game
        .request_battle("arena", ("a", "Alice"), ("b", "Bob"), Some(3))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    f.game.manager().check_battles().await;
    assert!(f.game.manager().is_busy("a").await);
    assert_eq!(f.sink.count_containing("has expired"), 0);

    tokio::time::advance(Duration::from_secs(2)).await;
    f.game.manager().check_battles().await;
    f.game.manager().check_battles().await;

    assert_eq!(f.sink.count_containing("<@a> Your battle with Bob has expired"), 1);
    assert!(f.game.manager().is_empty().await);
    assert!(matches!(
        f.game.accept_battle("b").await,
        Err(GameError::NoPendingBattle)
    ));
    for id in ["a", "b"] {
        let p = f.game.roster().get(id).await.unwrap().snapshot().await;
        assert_eq!((p.money, p.wins, p.losses, p.xp), (10, 0, 0, 0));
    }
}

#[tokio::test(start_paused = true)]
async fn sweeper_task_expires_in_the_background() {
    let f = fixed_game(vec![player("a", "Alice", 10), player("b", "Bob", 10)]);
    let sweeper = f.game.spawn_sweeper();
    f.game
        .request_battle("arena", ("a", "Alice"), ("b", "Bob"), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(62)).await;
    assert_eq!(f.sink.count_containing("has expired"), 1);
    assert!(!f.game.manager().is_busy("b").await);
    sweeper.abort();
}

#[tokio::test]
async fn monster_fight_never_charges_the_human() {
    let f = fixed_game(vec![player("h", "Hero", 20)]);
    let outcome = f
        .game
        .fight_monster("arena", "h", "Hero")
        .await
        .unwrap()
        .await
        .unwrap();

    // constant rolls pick a normal Bushes that strikes first and wins
    assert_eq!(f.sink.count_containing("encountered a **Normal Bushes**"), 1);
    match outcome {
        Some(BattleOutcome::Decided { winner_id, .. }) => assert!(winner_id.starts_with("monster:")),
        other => panic!("unexpected {:?}", other),
    }
    let hero = f.game.roster().get("h").await.unwrap().snapshot().await;
    assert_eq!((hero.money, hero.losses), (20, 1));
    assert_eq!(f.game.roster().len().await, 1);
    assert!(f.game.manager().is_empty().await);
}

#[tokio::test]
async fn panicking_item_only_aborts_its_battle() {
    let catalog = ItemCatalog::default().with(ItemType::new(
        99,
        "Cursed Crown",
        "Breaks everything",
        0,
        vec![EquipmentSlot::Head],
        ItemEffectEmitter::new(
            vec![],
            vec![Trigger::new(TriggerEvent::Turn, 0.0, Target::Wearer, |_, _| {
                panic!("cursed")
            })],
        ),
    ));
    let mut cursed = player("a", "Alice", 10);
    cursed.inventory = vec![PlayerItem {
        item_type_id: 99,
        equipment_slot: EquipmentSlot::Head,
    }];
    let f = game_with(
        catalog,
        fixed_rollers(0.5),
        vec![cursed, player("b", "Bob", 10), player("c", "Cid", 10)],
    );

    f.game
        .request_battle("arena", ("a", "Alice"), ("b", "Bob"), None)
        .await
        .unwrap();
    let outcome = f.game.accept_battle("b").await.unwrap().await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(f.sink.count_containing("was aborted"), 1);

    // player locks were released on unwind
    let bob = f.game.roster().get("b").await.unwrap();
    assert_eq!(bob.lock().await.money, 10);

    // the registry keeps working
    f.game
        .request_battle("arena", ("c", "Cid"), ("b", "Bob"), None)
        .await
        .unwrap();
    let outcome = f.game.accept_battle("b").await.unwrap().await.unwrap();
    assert!(matches!(outcome, Some(BattleOutcome::Decided { .. })));
}
