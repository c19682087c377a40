//! Capabilities for observing and driving the translator surface

use async_trait::async_trait;
use std::future::Future;

use crate::Result;

/// Read access to the full current text of the observed surface.
///
/// Implementations must be cheap to call repeatedly and must not change
/// what the surface shows.
#[async_trait]
pub trait Sampler: Send {
    async fn sample(&mut self) -> Result<String>;
}

/// Write access to the surface's input.
#[async_trait]
pub trait Stimulus: Send {
    /// Replace the input text. An empty string clears it.
    async fn set_input(&mut self, text: &str) -> Result<()>;

    /// Current value of the input.
    async fn input_value(&mut self) -> Result<String>;
}

/// A surface that can be both driven and observed.
pub trait Surface: Sampler + Stimulus {}

impl<T: Sampler + Stimulus + ?Sized> Surface for T {}

#[async_trait]
impl<S: Sampler + ?Sized> Sampler for &mut S {
    async fn sample(&mut self) -> Result<String> {
        (**self).sample().await
    }
}

/// Sampler backed by an async closure.
pub struct FnSampler<F>(F);

/// Build a [`Sampler`] from a closure returning a future.
pub fn sampler_fn<F, Fut>(f: F) -> FnSampler<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<String>> + Send,
{
    FnSampler(f)
}

#[async_trait]
impl<F, Fut> Sampler for FnSampler<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn sample(&mut self) -> Result<String> {
        (self.0)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_fn_sampler_calls_closure_each_time() {
        let mut calls = 0;
        let mut sampler = sampler_fn(move || {
            calls += 1;
            let n = calls;
            async move {
                if n == 2 {
                    Err(Error::Surface("detached".to_string()))
                } else {
                    Ok(format!("sample {}", n))
                }
            }
        });

        assert_eq!(sampler.sample().await.unwrap(), "sample 1");
        assert!(sampler.sample().await.is_err());
        assert_eq!(sampler.sample().await.unwrap(), "sample 3");
    }

    #[tokio::test]
    async fn test_mut_ref_forwards() {
        async fn take<S: Sampler>(mut sampler: S) -> Result<String> {
            sampler.sample().await
        }

        let mut inner = sampler_fn(|| async { Ok("x".to_string()) });
        assert_eq!(take(&mut inner).await.unwrap(), "x");
        assert_eq!(inner.sample().await.unwrap(), "x");
    }
}
