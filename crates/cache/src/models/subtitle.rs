use crate::Subtitle;
use crate::error::{Error, ErrorKind};

#[derive(sqlx::FromRow)]
pub(crate) struct SubtitleRow {
    pub(crate) subtitle_id: String,
    pub(crate) video_id: String,
    pub(crate) text: String,
    pub(crate) start: f64,
    pub(crate) end: f64,
}
impl TryFrom<&Subtitle> for SubtitleRow {
    type Error = Error;
    fn try_from(subtitle: &Subtitle) -> Result<Self, Self::Error> {
        // SQLite stores NaN as NULL, which the NOT NULL constraint would then
        // reject with a far less helpful message.
        if !subtitle.start.is_finite() {
            exn::bail!(ErrorKind::InvalidData("start time"));
        }
        if !subtitle.end.is_finite() {
            exn::bail!(ErrorKind::InvalidData("end time"));
        }
        Ok(Self {
            subtitle_id: subtitle.id.clone(),
            video_id: subtitle.video_id.clone(),
            text: subtitle.text.clone(),
            start: subtitle.start,
            end: subtitle.end,
        })
    }
}
impl From<SubtitleRow> for Subtitle {
    fn from(row: SubtitleRow) -> Self {
        Self {
            id: row.subtitle_id,
            video_id: row.video_id,
            start: row.start,
            end: row.end,
            text: row.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtitle(start: f64, end: f64) -> Subtitle {
        Subtitle {
            id: "73686f772f6570312e6d6b762f30".to_string(),
            video_id: "show/ep1.mkv".to_string(),
            start,
            end,
            text: "Hello there".to_string(),
        }
    }

    #[test]
    fn test_model_to_row_and_back() {
        let model = subtitle(1.5, 3.0);
        let row = SubtitleRow::try_from(&model).unwrap();
        assert_eq!(row.subtitle_id, model.id);
        assert_eq!(Subtitle::from(row), model);
    }

    #[test]
    fn test_non_finite_timings_are_rejected() {
        let err = SubtitleRow::try_from(&subtitle(f64::NAN, 3.0)).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidData("start time")));
        let err = SubtitleRow::try_from(&subtitle(1.0, f64::INFINITY)).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidData("end time")));
    }
}
