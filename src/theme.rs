//! Diagram palette and row shading policy.

/// Fill category of a column row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFill {
    PrimaryKey,
    ForeignKey,
    Even,
    Odd,
}

impl RowFill {
    /// Primary key wins over foreign key; other rows alternate by index.
    pub fn for_row(is_pk: bool, is_fk: bool, index: usize) -> Self {
        if is_pk {
            Self::PrimaryKey
        } else if is_fk {
            Self::ForeignKey
        } else if index % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    pub fn color<'a>(&self, palette: &'a Palette) -> &'a str {
        match self {
            Self::PrimaryKey => &palette.pk_bg,
            Self::ForeignKey => &palette.fk_bg,
            Self::Even => &palette.table_bg,
            Self::Odd => &palette.row_alt_bg,
        }
    }

    /// Marker drawn in front of the column label.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "◆ ",
            Self::ForeignKey => "◇ ",
            Self::Even | Self::Odd => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    pub background: String,
    pub grid: String,
    pub header_bg: String,
    pub header_text: String,
    pub table_bg: String,
    pub row_alt_bg: String,
    pub table_border: String,
    pub pk_bg: String,
    pub fk_bg: String,
    pub relationship: String,
    pub text: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            grid: "#F0F0F0".to_string(),
            header_bg: "#2E86AB".to_string(),
            header_text: "#FFFFFF".to_string(),
            table_bg: "#F8F9FA".to_string(),
            row_alt_bg: "#FFFFFF".to_string(),
            table_border: "#343A40".to_string(),
            pk_bg: "#FFE5B4".to_string(),
            fk_bg: "#E3F2FD".to_string(),
            relationship: "#E74C3C".to_string(),
            text: "#2C3E50".to_string(),
        }
    }
}
