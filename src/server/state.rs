use std::path::PathBuf;

use crate::overlay::OverlayStyle;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) style: OverlayStyle,
    /// Where rendered artifacts are kept; `None` streams results only.
    pub(crate) output_dir: Option<PathBuf>,
}
