//! Test cases, suites and plans.
//!
//! A [`TestSuite`] is an ordered list of named commands under a namespace label. A [`TestPlan`] is the ordered list
//! of suites run over one connection. Both are built once at startup (from a manifest or in code) and only read by
//! the runner afterwards.

/// One named command sent to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    command: String,
}

impl TestCase {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Ordered tests sharing a namespace label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    namespace: String,
    tests: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            tests: Vec::new(),
        }
    }

    /// Append a test; tests run in insertion order.
    pub fn add(&mut self, test: TestCase) -> &mut Self {
        self.tests.push(test);
        self
    }

    /// Builder form of [`TestSuite::add`].
    pub fn with_test(mut self, name: impl Into<String>, command: impl Into<String>) -> Self {
        self.tests.push(TestCase::new(name, command));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Keep only tests whose name contains `keyword`.
    pub fn filtered(&self, keyword: &str) -> TestSuite {
        TestSuite {
            namespace: self.namespace.clone(),
            tests: self.tests.iter().filter(|t| t.name.contains(keyword)).cloned().collect(),
        }
    }
}

/// Suites run one after the other over a single connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPlan {
    suites: Vec<TestSuite>,
}

impl TestPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, suite: TestSuite) {
        self.suites.push(suite);
    }

    pub fn with_suite(mut self, suite: TestSuite) -> Self {
        self.suites.push(suite);
        self
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Total number of tests across all suites.
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(TestSuite::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.test_count() == 0
    }

    /// Keep only tests whose name contains `keyword`, dropping suites left empty.
    pub fn filtered(&self, keyword: &str) -> TestPlan {
        TestPlan {
            suites: self
                .suites
                .iter()
                .map(|suite| suite.filtered(keyword))
                .filter(|suite| !suite.is_empty())
                .collect(),
        }
    }
}

impl FromIterator<TestSuite> for TestPlan {
    fn from_iter<I: IntoIterator<Item = TestSuite>>(iter: I) -> Self {
        Self {
            suites: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocations() -> TestSuite {
        TestSuite::new("Allocations")
            .with_test("Physical memory allocator", "kfuzz 100000 32000")
            .with_test("Virtual memory allocator", "vfuzz 100000 64000")
    }

    #[test]
    fn test_suite_preserves_order() {
        let suite = allocations();
        let names: Vec<_> = suite.tests().iter().map(TestCase::name).collect();
        assert_eq!(names, ["Physical memory allocator", "Virtual memory allocator"]);
        assert_eq!(suite.tests()[1].command(), "vfuzz 100000 64000");
    }

    #[test]
    fn test_add_chains() {
        let mut suite = TestSuite::new("Tests");
        suite.add(TestCase::new("Test_1", "shadok")).add(TestCase::new("Test_2", "cmd_test"));
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn test_plan_counts_all_suites() {
        let plan = TestPlan::new()
            .with_suite(allocations())
            .with_suite(TestSuite::new("Tests").with_test("Test_1", "cmd_test"));
        assert_eq!(plan.test_count(), 3);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_filter_drops_empty_suites() {
        let plan: TestPlan = [allocations(), TestSuite::new("Tests").with_test("Test_1", "cmd_test")]
            .into_iter()
            .collect();

        let filtered = plan.filtered("Virtual");
        assert_eq!(filtered.suites().len(), 1);
        assert_eq!(filtered.suites()[0].namespace(), "Allocations");
        assert_eq!(filtered.test_count(), 1);

        assert!(plan.filtered("nothing matches").is_empty());
    }
}
