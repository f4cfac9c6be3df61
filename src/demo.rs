//! Bundled sample spec units

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use dspec::{ensure_that, fail, skip, unit, SpecUnit};

/// Units that pass (apart from pending examples)
pub fn passing() -> Vec<Box<dyn SpecUnit>> {
    vec![
        unit("calculator", |s| {
            s.describe("Calculator", |s| {
                s.let_fixture("total", |_| Cell::new(0i64));
                s.before_each(|ctx| {
                    ctx.get::<Cell<i64>>("total")?.set(1);
                    Ok(())
                });

                s.it("starts from the seeded value", |ctx| {
                    ensure_that!(ctx.get::<Cell<i64>>("total")?.get() == 1);
                    Ok(())
                });

                s.context("when adding", |s| {
                    s.before_each(|ctx| {
                        let total = ctx.get::<Cell<i64>>("total")?;
                        total.set(total.get() + 2);
                        Ok(())
                    });
                    s.it("accumulates outer and inner setup", |ctx| {
                        let total = ctx.get::<Cell<i64>>("total")?.get();
                        ensure_that!(total == 3, "expected 3, got {total}");
                        Ok(())
                    });
                });

                s.it_pending("divides by zero gracefully");
            });
        }),
        unit("fixtures", |s| {
            s.describe("Lazy fixtures", |s| {
                s.let_fixture("session", |_| rand::random::<u64>());
                s.let_try_fixture("headers", |ctx| {
                    let session = ctx.get::<u64>("session")?;
                    let mut headers = HashMap::new();
                    headers.insert("x-session".to_string(), session.to_string());
                    Ok(headers)
                });

                s.it("memoizes within one example", |ctx| {
                    let first = ctx.get::<u64>("session")?;
                    let headers = ctx.get::<HashMap<String, String>>("headers")?;
                    ensure_that!(headers.get("x-session") == Some(&first.to_string()));
                    Ok(())
                });

                s.it("reports unknown fixtures as failures", |ctx| {
                    match ctx.resolve("missing") {
                        Err(signal) if signal.is_failure() => Ok(()),
                        _ => fail("resolving an unknown fixture should fail"),
                    }
                });
            });
        }),
        unit("lifecycle", |s| {
            s.describe("Hook lifecycle", |s| {
                s.before_context(|ctx| {
                    ctx.assign("log", RefCell::new(vec!["beforeContext".to_string()]));
                    Ok(())
                });
                s.before_each(|ctx| {
                    let log = ctx.get::<RefCell<Vec<String>>>("log")?;
                    log.borrow_mut().push("beforeEach".to_string());
                    Ok(())
                });

                s.it("sees context setup before each setup", |ctx| {
                    let log = ctx.get::<RefCell<Vec<String>>>("log")?;
                    ensure_that!(log.borrow().first().map(String::as_str) == Some("beforeContext"));
                    ensure_that!(log.borrow().last().map(String::as_str) == Some("beforeEach"));
                    Ok(())
                });
                s.xit("is disabled", |_| fail("disabled examples never run"));
            });
        }),
    ]
}

/// Units with failures and disabled groups, for exercising the failure path
pub fn troubled() -> Vec<Box<dyn SpecUnit>> {
    vec![unit("troubled", |s| {
        s.describe("Troubled", |s| {
            s.it("fails with a message", |_| fail("1 + 1 should be 2"));
            s.it("panics", |_| panic!("unexpected empty input"));
            s.it("skips itself", |_| skip("needs a network"));
            s.xdescribe("disabled group", |s| {
                s.it("would fail", |_| fail("never runs"));
            });
        });
    })]
}

/// Sample units to load
pub fn units(all: bool) -> Vec<Box<dyn SpecUnit>> {
    let mut units = passing();
    if all {
        units.extend(troubled());
    }
    units
}
