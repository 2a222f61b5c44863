use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use sp_core::HarnessError;
use tracing::debug;

use crate::build_regex;

fn system_alias_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"([^\s;]+) *= *(?:espressomd\.)?System *\(").expect("system alias regex must compile")
    })
}

fn numpy_seed_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(^|[\s;])(?:numpy|np)\.random\.seed *\(").expect("numpy seed regex must compile")
    })
}

/// Replaces hard-coded seeds so every run draws fresh random numbers:
/// assignments to `<system>.seed` or `<system>.random_number_generator_state`
/// re-randomize the system instead, and `np.random.seed(...)` does nothing.
pub fn set_random_seeds(code: &str) -> Result<String, HarnessError> {
    let aliases = system_alias_regex()
        .captures_iter(code)
        .filter_map(|captures| captures.get(1).map(|alias| alias.as_str().to_string()))
        .collect::<BTreeSet<_>>();

    let mut code = code.to_string();
    for alias in &aliases {
        let pattern = build_regex(&format!(
            r"(^|[\s;]){}\.(?:seed|random_number_generator_state)( *=)([^=])",
            regex::escape(alias)
        ))?;
        code = pattern
            .replace_all(&code, |captures: &Captures<'_>| {
                format!(
                    "{}{alias}.set_random_state_PRNG(); _random_seed_es__original{}{}",
                    &captures[1], &captures[2], &captures[3]
                )
            })
            .into_owned();
    }
    debug!(systems = ?aliases, "neutralized random seeds");

    Ok(numpy_seed_regex()
        .replace_all(&code, "${1}_random_seed_np = (lambda *args, **kwargs: None)(")
        .into_owned())
}

#[cfg(test)]
mod seeds_tests {
    use super::*;

    #[test]
    fn system_seed_assignments_rerandomize() {
        let code = "system = espressomd.System(box_l=[10] * 3)\nsystem.seed = 42\nsystem.random_number_generator_state = state\n";
        let rewritten = set_random_seeds(code).expect("seeds should rewrite");
        assert_eq!(
            rewritten,
            "system = espressomd.System(box_l=[10] * 3)\nsystem.set_random_state_PRNG(); _random_seed_es__original = 42\nsystem.set_random_state_PRNG(); _random_seed_es__original = state\n"
        );
    }

    #[test]
    fn numpy_seed_calls_become_no_ops() {
        let code = "import numpy as np\nnp.random.seed(1); numpy.random.seed (seed=2)\n";
        let rewritten = set_random_seeds(code).expect("seeds should rewrite");
        assert_eq!(
            rewritten,
            "import numpy as np\n_random_seed_np = (lambda *args, **kwargs: None)(1); _random_seed_np = (lambda *args, **kwargs: None)(seed=2)\n"
        );
    }

    #[test]
    fn comparisons_and_other_objects_are_untouched() {
        let code = "from espressomd import System\ns = System(box_l=[1, 1, 1])\nif s.seed == 3:\n    other.seed = 4\nmysystem.seed = 5\n";
        let rewritten = set_random_seeds(code).expect("seeds should rewrite");
        assert_eq!(rewritten, code);
    }

    #[test]
    fn inline_assignment_after_semicolon() {
        let code = "sys2 = System(); sys2.seed=7\n";
        let rewritten = set_random_seeds(code).expect("seeds should rewrite");
        assert_eq!(
            rewritten,
            "sys2 = System(); sys2.set_random_state_PRNG(); _random_seed_es__original=7\n"
        );
    }
}
