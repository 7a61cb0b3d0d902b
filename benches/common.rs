#![allow(dead_code)]

use qao_runtime::prelude::*;
use qao_runtime::PriorityResolver;

pub const OBJECTS_SMALL: usize = 10_000;
pub const OBJECTS_MED: usize = 100_000;

pub const CATEGORIES: [(&str, i32); 4] = [
    ("input", -10),
    ("agent", 0),
    ("effect", 5),
    ("camera", 100),
];

/// Minimal stateful object.
pub struct Walker {
    pub position: f32,
    pub velocity: f32,
}

impl ActiveObject for Walker {
    fn update(&mut self, _ctx: &mut StepContext<'_, Self>) {
        self.position += self.velocity;
    }
}

pub fn make_runtime() -> Runtime<Walker> {
    Runtime::with_resolver(CATEGORIES.into_iter().collect::<PriorityResolver>())
}

/// Creates `count` walkers spread round-robin over the categories.
pub fn populate(runtime: &mut Runtime<Walker>, count: usize) -> RuntimeResult<Vec<OwnedHandle>> {
    (0..count)
        .map(|i| {
            let (category, _) = CATEGORIES[i % CATEGORIES.len()];
            runtime.create(category, Walker { position: 0.0, velocity: i as f32 * 0.01 })
        })
        .collect()
}
