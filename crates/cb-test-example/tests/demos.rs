use cb_test_example::{demo_dir, demo_names, demos_root, testcase_path};
use cb_tool::{assert_case, discover_cases};

#[test]
fn every_demo_has_a_testcase() {
    let cases = discover_cases(&demos_root()).expect("demo cases should be discovered");
    assert_eq!(cases.len(), demo_names().len());
}

#[test]
fn demo_testcases_pass() {
    for name in demo_names() {
        let report = assert_case(&demo_dir(&name), &testcase_path(&name))
            .unwrap_or_else(|error| panic!("demo {} failed: {}", name, error));
        assert!(report.messages > 0, "demo {} sent no messages", name);
    }
}
