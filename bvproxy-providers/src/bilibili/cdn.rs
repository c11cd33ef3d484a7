//! CDN mirror rewriting for resolved video URLs.

use rand::seq::IndexedRandom;
use tracing::{debug, warn};
use url::Url;

/// Interchangeable upos mirrors serving the same media objects.
pub const BILI_CDN_MIRRORS: [&str; 3] = [
    "upos-sz-mirrorcos.bilivideo.com",
    "upos-sz-mirrorali.bilivideo.com",
    "upos-sz-mirror08c.bilivideo.com",
];

/// Strategy for choosing a mirror host.
pub trait MirrorSelector: Send + Sync {
    fn pick<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str>;
}

/// Uniform random choice.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMirror;

impl MirrorSelector for RandomMirror {
    fn pick<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str> {
        mirrors.choose(&mut rand::rng()).copied()
    }
}

/// Replace the network location of `url` with a mirror from [`BILI_CDN_MIRRORS`].
///
/// Only the authority between `scheme://` and the first `/`, `?` or `#` is
/// replaced, so scheme, path, query and fragment are kept byte for byte. Any
/// port or userinfo belongs to the old host and is dropped with it. Input that
/// does not parse as a URL with a host is returned unchanged.
pub fn rewrite_host(url: &str, selector: &dyn MirrorSelector) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => {}
        Ok(_) => {
            warn!("Not rewriting url without host: {}", url);
            return url.to_string();
        }
        Err(e) => {
            warn!("Not rewriting unparseable url {}: {}", url, e);
            return url.to_string();
        }
    }

    let Some((start, end)) = authority_span(url) else {
        warn!("Not rewriting url without authority: {}", url);
        return url.to_string();
    };

    let Some(mirror) = selector.pick(&BILI_CDN_MIRRORS) else {
        return url.to_string();
    };

    debug!(mirror, "Rewrote cdn host");
    format!("{}{mirror}{}", &url[..start], &url[end..])
}

/// Byte range of the authority component in the raw input.
fn authority_span(url: &str) -> Option<(usize, usize)> {
    let start = url.find("://")? + 3;
    let len = url[start..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - start);
    Some((start, start + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    impl MirrorSelector for Fixed {
        fn pick<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str> {
            mirrors.get(self.0).copied()
        }
    }

    const SAMPLE: &str = "https://cn-hk-eq-01-13.bilivideo.com/upgcxcode/82/51/1234/1234-1-192.mp4?e=ig8euxZM2rNcNbRVhwdVhwdlhWdVhwdVhoNvNC8BqJIzNbfq9rVEuxTEnE8L5F6VnEsSTx0vkX8fqJeYTj_lta53NCM=&uipk=5&nbs=1&deadline=1700000000&gen=playurlv2&os=bcache&oi=0&trid=0000&mid=0&platform=html5&upsig=abc&uparams=e,uipk,nbs,deadline,gen,os,oi,trid,mid,platform&bvc=vod&nettype=0&bw=1&logo=80000000#frag";

    #[test]
    fn test_rewrite_keeps_non_host_parts() {
        let out = rewrite_host(SAMPLE, &Fixed(1));
        let expected = SAMPLE.replacen(
            "cn-hk-eq-01-13.bilivideo.com",
            "upos-sz-mirrorali.bilivideo.com",
            1,
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rewrite_does_not_normalize() {
        assert_eq!(
            rewrite_host("HTTPS://cn.bilivideo.com/v/../a.mp4?e=1", &Fixed(0)),
            "HTTPS://upos-sz-mirrorcos.bilivideo.com/v/../a.mp4?e=1"
        );
        assert_eq!(
            rewrite_host("https://cn.bilivideo.com/a.mp4?x=it's&y=a b#frag ment", &Fixed(0)),
            "https://upos-sz-mirrorcos.bilivideo.com/a.mp4?x=it's&y=a b#frag ment"
        );
        assert_eq!(
            rewrite_host("https://cn.bilivideo.com?e=1", &Fixed(2)),
            "https://upos-sz-mirror08c.bilivideo.com?e=1"
        );
        assert_eq!(
            rewrite_host("https://cn.bilivideo.com", &Fixed(2)),
            "https://upos-sz-mirror08c.bilivideo.com"
        );
    }

    #[test]
    fn test_rewrite_drops_userinfo() {
        assert_eq!(
            rewrite_host("https://user:pw@cn.bilivideo.com:443/a.mp4", &Fixed(0)),
            "https://upos-sz-mirrorcos.bilivideo.com/a.mp4"
        );
    }

    #[test]
    fn test_rewrite_drops_port() {
        let out = rewrite_host("http://upos.example.com:8082/a/b.flv?x=1", &Fixed(0));
        assert_eq!(out, "http://upos-sz-mirrorcos.bilivideo.com/a/b.flv?x=1");
    }

    #[test]
    fn test_random_mirror_is_always_listed() {
        for _ in 0..64 {
            let out = rewrite_host(SAMPLE, &RandomMirror);
            let host = Url::parse(&out).unwrap().host_str().unwrap().to_string();
            assert!(BILI_CDN_MIRRORS.contains(&host.as_str()));
        }
    }

    #[test]
    fn test_unparseable_is_unchanged() {
        assert_eq!(rewrite_host("not a url", &RandomMirror), "not a url");
        assert_eq!(rewrite_host("", &RandomMirror), "");
        assert_eq!(rewrite_host("mailto:a@b.c", &RandomMirror), "mailto:a@b.c");
    }

    #[test]
    fn test_empty_selection_is_unchanged() {
        struct Nothing;
        impl MirrorSelector for Nothing {
            fn pick<'a>(&self, _: &[&'a str]) -> Option<&'a str> {
                None
            }
        }
        assert_eq!(rewrite_host(SAMPLE, &Nothing), SAMPLE);
    }
}
