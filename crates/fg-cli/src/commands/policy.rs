//! Policy command: print the effective policy.

use std::io::Write;

use anyhow::Result;

use fg_core::UsagePolicy;

pub fn run<W: Write>(writer: &mut W, policy: &UsagePolicy) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, policy)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn test_default_policy_output() {
        let mut output = Vec::new();
        run(&mut output, &UsagePolicy::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
        {
          "version": 1,
          "max_range_ms": 604800000,
          "min_session_ms": 1000,
          "merge_window_ms": 1000,
          "max_daily_usage_ms": 43200000,
          "inflated_ratio": 1.5,
          "deflated_ratio": 0.67,
          "today": {
            "max_range_ms": 86400000,
            "min_usage_ms": 2000,
            "max_daily_usage_ms": 28800000,
            "truncate_to_second": true,
            "cross_check_tolerance": 0.1
          }
        }
        "#);
    }
}
