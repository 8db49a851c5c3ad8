//! Progress tracking for a running test suite

use serde::{Deserialize, Serialize};

pub const PROGRESS_TITLE: &str = "Run Tests";

/// A node of the test tree as the test runner reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNode {
    pub name: String,
    pub unique_name: String,
    /// Number of test cases below (and including) this node
    pub test_case_count: usize,
    #[serde(default)]
    pub children: Vec<TestNode>,
}

impl TestNode {
    /// A test case without children
    pub fn case<N: Into<String>>(name: N) -> Self {
        let name = name.into();
        Self {
            unique_name: name.clone(),
            name,
            test_case_count: 1,
            children: Vec::new(),
        }
    }

    /// A suite; its case count is the sum over its children
    pub fn suite<N: Into<String>>(name: N, children: Vec<TestNode>) -> Self {
        let name = name.into();
        Self {
            unique_name: name.clone(),
            test_case_count: children.iter().map(|child| child.test_case_count).sum(),
            name,
            children,
        }
    }

    /// Pre-order position of the node named `unique_name`, root being 0
    pub fn position_of(&self, unique_name: &str) -> Option<usize> {
        let mut counter = 0;
        if self.count_until(unique_name, &mut counter) {
            Some(counter)
        } else {
            None
        }
    }

    fn count_until(&self, unique_name: &str, counter: &mut usize) -> bool {
        if self.unique_name == unique_name {
            return true;
        }
        *counter += 1;
        self.children.iter().any(|child| child.count_until(unique_name, counter))
    }
}

/// Tracks how far a test run got
#[derive(Debug, Clone, Default)]
pub struct TestProgress {
    root: Option<TestNode>,
    max: usize,
}

impl TestProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the tree about to run
    pub fn run_started(&mut self, root: TestNode) {
        self.max = root.test_case_count;
        self.root = Some(root);
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Index of a starting test and the message to show for it
    pub fn test_started(&self, test: &TestNode) -> (usize, String) {
        let index = self
            .root
            .as_ref()
            .and_then(|root| root.position_of(&test.unique_name))
            .unwrap_or(0);

        (index, format!("Test is running now: {} ({} / {})", test.name, index, self.max))
    }

    /// Fraction of the run done once test number `index` starts
    pub fn fraction(&self, index: usize) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        index as f32 / self.max as f32
    }

    pub fn reset(&mut self) {
        self.root = None;
        self.max = 0;
    }
}
