use html::Document;

/// A pass run over a page once its tree has been built, before it is written out
pub trait PostRenderHook {
    /// Shown in logs
    fn name(&self) -> &str;

    fn on_ready(&self, document: &mut Document);
}
