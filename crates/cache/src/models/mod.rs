mod subtitle;

pub(crate) use self::subtitle::SubtitleRow;
