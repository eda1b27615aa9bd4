//! Entry point generation for the bundler.
//!
//! The generated module starts the ClojureScript engine with the user's
//! build options inlined as a literal.

use std::path::Path;

use tracing::info;

use crate::common::write_file_with_dirs;
use crate::options::BuildOptions;

/// Render the entry module source.
pub fn render(options: &BuildOptions) -> Result<String, serde_json::Error> {
    let literal = serde_json::to_string(&options.runtime_options())?;
    Ok(format!(
        r#"import startClojureScriptEngine from './cljs';
import * as util from './util';
import * as lumo from './lumo';
import v8 from 'v8';

const options = {literal};
const classpath = options['classpath'];

if (classpath.length !== 0) {{
  const srcPaths = util.srcPathsFromClasspathStrings(classpath);
  options.classpath = srcPaths;
  lumo.addSourcePaths(srcPaths);
}}

v8.setFlagsFromString('--use_strict');

startClojureScriptEngine(options);
"#
    ))
}

/// Write the entry module, replacing any earlier one.
pub fn write(path: &Path, options: &BuildOptions) -> Result<(), crate::error::BundleError> {
    let source = render(options)?;
    write_file_with_dirs(path, source)?;
    info!("Wrote entry point {}", path.display());
    Ok(())
}
