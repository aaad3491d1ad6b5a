use uuid::Uuid;

pub type Program = String;
pub type Args = Vec<String>;
pub type Dir = String;
pub type Envs = Vec<(String, String)>;
pub type JobId = Uuid;
pub type OutputBlob = bytes::Bytes;

/// Everything needed to launch a job's process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobCommand {
    pub program: Program,
    pub args: Args,
    /// working directory, inherits the supervisor's when `None`
    pub dir: Option<Dir>,
    pub envs: Envs,
}

impl JobCommand {
    pub fn new<I, S>(program: impl Into<Program>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            envs: Envs::new(),
        }
    }

    pub fn dir(mut self, dir: impl Into<Dir>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn env(mut self, var: impl Into<String>, val: impl Into<String>) -> Self {
        self.envs.push((var.into(), val.into()));
        self
    }
}
