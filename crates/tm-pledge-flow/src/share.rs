use tm_api_types::Fid;
use tm_chain_client::Cast;

pub const SHARE_TEXT: &str = "Signed the trustless manifesto!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTarget {
    pub signer_fid: Option<Fid>,
    pub share_url: String,
}

impl ShareTarget {
    /// `<base>/share/<fid>` when the viewer is known, otherwise `<base>`.
    pub fn new(base_url: &str, signer_fid: Option<Fid>) -> Self {
        let base = base_url.trim_end_matches('/');
        let share_url = match signer_fid {
            Some(fid) => format!("{base}/share/{fid}"),
            None => base.to_owned(),
        };
        Self {
            signer_fid,
            share_url,
        }
    }

    pub fn cast(&self) -> Cast {
        Cast {
            text: SHARE_TEXT.to_owned(),
            embeds: vec![self.share_url.clone()],
        }
    }
}
