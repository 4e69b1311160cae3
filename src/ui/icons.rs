pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const SEARCH: &str = "🔍";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const FILE: &str = "📄";
    pub const FOLDER: &str = "📂";
    pub const DATABASE: &str = "🗄️";
    pub const CLOCK: &str = "⏱️";
    pub const FRAUD: &str = "🔴";
    pub const LEGIT: &str = "🟢";
    pub const HISTORY: &str = "🕘";
}
