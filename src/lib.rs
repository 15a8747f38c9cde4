use pyo3::prelude::*;
use pyo3::wrap_pymodule;
use strato_core::python::core;
use strato_diagnostics::python::diagnostics;

#[pymodule]
#[pyo3(name = "_lib")]
fn strato(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_wrapped(wrap_pymodule!(core))?;
    m.add_wrapped(wrap_pymodule!(diagnostics))?;

    set_path(m, "strato._lib.core", "core")?;
    set_path(m, "strato._lib.diagnostics", "diagnostics")?;

    Ok(())
}

/// Register a wrapped submodule so `import strato._lib.<name>` works
fn set_path(m: &Bound<'_, PyModule>, path: &str, module: &str) -> PyResult<()> {
    let code = format!(
        "\
import sys
sys.modules['{path}'] = {module}
    "
    );
    m.py().run_bound(&code, None, Some(&m.dict()))
}
