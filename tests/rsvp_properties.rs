mod common;

use proptest::prelude::*;
use std::collections::HashSet;
use townsquare::error::AppError;

#[derive(Debug, Clone, Copy)]
enum Op {
    Create { user: usize, event: usize },
    Withdraw { user: usize, event: usize },
}

fn op() -> impl Strategy<Value = Op> {
    (0usize..3, 0usize..2, any::<bool>()).prop_map(|(user, event, create)| {
        if create {
            Op::Create { user, event }
        } else {
            Op::Withdraw { user, event }
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn each_pair_has_at_most_one_rsvp(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let w = common::world().await;
            let owner = w.member().await;
            let mut users = Vec::new();
            for _ in 0..3 {
                users.push(w.member().await);
            }
            let events = vec![
                w.event_by(&owner, "Morning Run", 2).await,
                w.event_by(&owner, "Evening Swim", 3).await,
            ];

            let mut model: HashSet<(usize, usize)> = HashSet::new();
            for op in ops {
                match op {
                    Op::Create { user, event } => {
                        let (event_id, user_id) = (events[event].id, users[user].id);
                        let result = w.state.rsvps.create_rsvp(event_id, user_id).await;
                        if model.insert((user, event)) {
                            prop_assert!(result.is_ok());
                        } else {
                            prop_assert!(matches!(result, Err(AppError::AlreadyExists(_))));
                        }
                    }
                    Op::Withdraw { user, event } => {
                        let (event_id, user_id) = (events[event].id, users[user].id);
                        let result = w.state.rsvps.withdraw_rsvp(event_id, user_id).await;
                        if model.remove(&(user, event)) {
                            prop_assert!(result.is_ok());
                        } else {
                            prop_assert!(matches!(result, Err(AppError::NotFound(_))));
                        }
                    }
                }

                for (e, event) in events.iter().enumerate() {
                    for (u, user) in users.iter().enumerate() {
                        let has = w.state.rsvps.has_rsvp(event.id, Some(user.id)).await.unwrap();
                        prop_assert_eq!(has, model.contains(&(u, e)));
                    }
                    let expected = model.iter().filter(|(_, me)| *me == e).count() as i64;
                    prop_assert_eq!(w.state.rsvps.count_rsvps(event.id).await.unwrap(), expected);
                }
            }
            Ok(())
        })?;
    }
}
