use sp_core::{column_byte_index, HarnessError, SourceLocation};
use tracing::debug;

use crate::build_regex;
use crate::lines::{split_lines, split_terminator};
use crate::locate::MatplotlibImports;
use crate::magics::{blank_ipython_magics, deprotect_ipython_magics, protect_ipython_magics};

/// Statement spliced in front of the first matplotlib import.
pub const AGG_BACKEND_SETUP: &str = "import matplotlib as _mpl;_mpl.use('Agg');";

/// Forces the non-interactive `Agg` backend, drops explicit backend choices,
/// turns `ion()` into `ioff()` and blanks IPython magic lines.
pub fn disable_matplotlib_gui(code: &str) -> Result<String, HarnessError> {
    let protected = protect_ipython_magics(code);
    let imports = MatplotlibImports::locate(&protected)?;
    let mut code = protected;

    for alias in imports.matplotlib_names() {
        let pattern = build_regex(&format!(
            r#"(?m)^[\t ]*{}\.use\((?:"+[^"\n]+?"+|'+[^'\n]+?'+)[\t ]*\)"#,
            regex::escape(alias)
        ))?;
        code = pattern.replace_all(&code, "").into_owned();
    }

    if let Some(first) = imports.first {
        code = insert_at(&code, first, AGG_BACKEND_SETUP);
        debug!(line = first.line, "forced Agg backend");
    }

    for alias in imports.pyplot_names() {
        let pattern = build_regex(&format!(
            r"(?m)((?:^|;)[\t ]*{})\.ion\(",
            regex::escape(alias)
        ))?;
        code = pattern.replace_all(&code, "${1}.ioff(").into_owned();
    }

    let code = deprotect_ipython_magics(&code);
    Ok(blank_ipython_magics(&code))
}

fn insert_at(code: &str, location: SourceLocation, text: &str) -> String {
    let mut lines = split_lines(code);
    if let Some(line) = lines.get_mut(location.line - 1) {
        let index = column_byte_index(split_terminator(line).0, location.column);
        line.insert_str(index, text);
    }
    lines.concat()
}

#[cfg(test)]
mod matplotlib_tests {
    use super::*;

    #[test]
    fn forces_agg_and_turns_interactive_mode_off() {
        let code = "import numpy as np\nimport matplotlib.pyplot as plt\nplt.ion()\nplt.plot([1])\n";
        let rewritten = disable_matplotlib_gui(code).expect("script should rewrite");
        assert_eq!(
            rewritten,
            "import numpy as np\nimport matplotlib as _mpl;_mpl.use('Agg');import matplotlib.pyplot as plt\nplt.ioff()\nplt.plot([1])\n"
        );
    }

    #[test]
    fn strips_explicit_backend_selection() {
        let code = "import matplotlib\nmatplotlib.use('TkAgg')\nimport matplotlib.pyplot as plt\n    matplotlib.use(\"Qt5Agg\" )\n";
        let rewritten = disable_matplotlib_gui(code).expect("script should rewrite");
        assert_eq!(
            rewritten,
            "import matplotlib as _mpl;_mpl.use('Agg');import matplotlib\n\nimport matplotlib.pyplot as plt\n\n"
        );
    }

    #[test]
    fn indented_first_import_keeps_its_indentation() {
        let code = "try:\n    from matplotlib import pyplot as p\nexcept ImportError:\n    pass\nx = 1; p.ion()\n";
        let rewritten = disable_matplotlib_gui(code).expect("script should rewrite");
        assert_eq!(
            rewritten,
            "try:\n    import matplotlib as _mpl;_mpl.use('Agg');from matplotlib import pyplot as p\nexcept ImportError:\n    pass\nx = 1; p.ioff()\n"
        );
    }

    #[test]
    fn blanks_ipython_magics_after_analysis() {
        let code = "%matplotlib notebook\nimport matplotlib.pyplot as plt\nget_ipython().system('ls')\n";
        let rewritten = disable_matplotlib_gui(code).expect("script should rewrite");
        assert_eq!(
            rewritten,
            "\nimport matplotlib as _mpl;_mpl.use('Agg');import matplotlib.pyplot as plt\n\n"
        );
    }

    #[test]
    fn ion_inside_other_calls_is_untouched() {
        let code = "import matplotlib.pyplot as plt\nf(plt.ion())\n";
        let rewritten = disable_matplotlib_gui(code).expect("script should rewrite");
        assert!(rewritten.ends_with("f(plt.ion())\n"));
    }

    #[test]
    fn scripts_without_matplotlib_are_unchanged() {
        let code = "import espressomd\nsystem = espressomd.System(box_l=[1, 1, 1])\n";
        assert_eq!(disable_matplotlib_gui(code).expect("script should rewrite"), code);
    }
}
