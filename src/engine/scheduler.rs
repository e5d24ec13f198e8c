use crate::error::ConfigError;
use log::info;
use std::fmt;
use std::str::FromStr;

/// One entry of the configured task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    DetectContactsFollowBack,
    DetectContactsFromPhoto(String),
    DetectContactsUnfollowBack,
    DetectRecentContactPhotos,
    DetectExplored,
    SearchKeywords,
    DoContactsFollow,
    DoContactsUnfollow,
    DoContactsInactiveUnfollow,
    DoContactsFav,
    DoPhotosFav,
    Save,
    Wait,
    Loop,
}

impl FromStr for Task {
    type Err = ConfigError;

    /// Names are case-insensitive. Arguments follow an `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (s, None),
        };
        let task = match name.to_ascii_lowercase().as_str() {
            "detectcontactsfollowback" => Task::DetectContactsFollowBack,
            "detectcontactsfromphoto" => match arg {
                Some(url) if !url.is_empty() => Task::DetectContactsFromPhoto(url.to_string()),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "system.tasks".to_string(),
                        reason: format!("no URL was specified for {}", name),
                    })
                }
            },
            "detectcontactsunfollowback" => Task::DetectContactsUnfollowBack,
            "detectrecentcontactphotos" => Task::DetectRecentContactPhotos,
            "detectexplored" => Task::DetectExplored,
            "searchkeywords" => Task::SearchKeywords,
            "docontactsfollow" => Task::DoContactsFollow,
            "docontactsunfollow" => Task::DoContactsUnfollow,
            "docontactsinactiveunfollow" => Task::DoContactsInactiveUnfollow,
            "docontactsfav" => Task::DoContactsFav,
            "dophotosfav" => Task::DoPhotosFav,
            "save" => Task::Save,
            "wait" => Task::Wait,
            "loop" => Task::Loop,
            _ => return Err(ConfigError::UnknownTask { name: s.to_string() }),
        };
        Ok(task)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::DetectContactsFromPhoto(url) => write!(f, "DetectContactsFromPhoto={}", url),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Walks the task list, restarting it at each `Loop` until the restart limit
/// is spent.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tasks: Vec<Task>,
    cursor: usize,
    loops: u32,
    loop_limit: u32,
}

impl Scheduler {
    /// `loop_limit` of 0 loops forever.
    pub fn new(tasks: Vec<Task>, loop_limit: u32) -> Self {
        Self { tasks, cursor: 0, loops: 0, loop_limit }
    }

    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Whether the `Loop` just returned should restart the list.
    fn may_restart(&self) -> bool {
        self.loop_limit == 0 || self.loops < self.loop_limit
    }

    /// Next task to run. A returned `Loop` has already rewound the cursor when
    /// a restart is allowed; otherwise the list ends after it.
    pub fn next_task(&mut self) -> Option<Task> {
        let task = self.tasks.get(self.cursor)?.clone();
        self.cursor += 1;
        if task == Task::Loop {
            if self.may_restart() {
                self.loops += 1;
                self.cursor = 0;
                info!("Loop #{}", self.loops);
            } else {
                info!("Loop limit of {} reached", self.loop_limit);
                self.cursor = self.tasks.len();
            }
        }
        Some(task)
    }

    /// True when the last `Loop` returned actually restarted the list.
    pub fn restarted(&self) -> bool {
        self.cursor == 0 && self.loops > 0
    }
}
