//! Decorative walk-through of the request pipeline

use rand::seq::index;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub title: &'static str,
    pub summary: &'static str,
    pub detail: &'static str,
}

pub const STEPS: [Step; 5] = [
    Step {
        title: "User Query",
        summary: "Natural language input",
        detail: "User submits a query in natural language",
    },
    Step {
        title: "Orchestrator Agent",
        summary: "Query analysis",
        detail: "AI analyzes query and creates execution plan",
    },
    Step {
        title: "Server Selection",
        summary: "Semantic search",
        detail: "Searches server indexes to find relevant servers",
    },
    Step {
        title: "Tool Discovery",
        summary: "Query embedding match",
        detail: "Finds best matching tools from selected servers",
    },
    Step {
        title: "Execution",
        summary: "Tools run & return results",
        detail: "Executes tools and returns formatted results",
    },
];

/// Example servers shown in the diagram. Not the live registry.
pub const SERVERS: [&str; 5] = ["Slack", "HubSpot", "Microsoft", "Zomato", "Neon"];

/// Step on entry to which a new set of servers is highlighted
pub const SELECTION_STEP: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct WorkflowAnimation {
    active: usize,
    highlighted: Vec<usize>,
}

impl WorkflowAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_step(&self) -> usize {
        self.active
    }

    pub fn step(&self) -> &'static Step {
        &STEPS[self.active]
    }

    /// Indices into [`SERVERS`], ascending
    pub fn highlighted(&self) -> &[usize] {
        &self.highlighted
    }

    pub fn is_highlighted(&self, server: usize) -> bool {
        self.highlighted.contains(&server)
    }

    /// Move to the next step, wrapping after the last one. Entering the
    /// selection step picks two or three distinct servers at random.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let next = (self.active + 1) % STEPS.len();
        if next == SELECTION_STEP {
            let count = rng.random_range(2..=3);
            let mut picked = index::sample(rng, SERVERS.len(), count).into_vec();
            picked.sort_unstable();
            self.highlighted = picked;
        }
        self.active = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_wraps_after_last_step() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut animation = WorkflowAnimation::new();
        for _ in 0..STEPS.len() {
            animation.advance(&mut rng);
        }
        assert_eq!(animation.active_step(), 0);
        assert_eq!(animation.step().title, "User Query");
    }

    #[test]
    fn test_selection_highlights_two_or_three_distinct() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut animation = WorkflowAnimation::new();
            assert!(animation.highlighted().is_empty());

            animation.advance(&mut rng);
            animation.advance(&mut rng);
            assert_eq!(animation.active_step(), SELECTION_STEP);

            let picked = animation.highlighted();
            assert!((2..=3).contains(&picked.len()), "picked {:?}", picked);
            assert!(picked.windows(2).all(|w| w[0] < w[1]));
            assert!(picked.iter().all(|&i| i < SERVERS.len()));
        }
    }

    #[test]
    fn test_highlight_kept_until_next_selection() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut animation = WorkflowAnimation::new();
        animation.advance(&mut rng);
        animation.advance(&mut rng);
        let picked = animation.highlighted().to_vec();
        animation.advance(&mut rng);
        animation.advance(&mut rng);
        assert_eq!(animation.highlighted(), picked.as_slice());
        assert!(animation.is_highlighted(picked[0]));
    }
}
