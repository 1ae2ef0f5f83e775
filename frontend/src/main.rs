use shared::{InfoResponse, Role, Turn};
use uuid::Uuid;
use web_sys::{Event, HtmlInputElement};
use yew::prelude::*;
use yew_hooks::use_event_with_window;

mod rpc;

const STYLE: &str = r#"
.app { display: flex; max-width: 1200px; margin: 0 auto; font-family: sans-serif; }
.sidebar { width: 260px; padding: 1rem; background: #f4f1fb; }
main { flex: 1; padding: 1rem 2rem; }
.messages { display: flex; flex-direction: column; gap: 0.5rem; margin-bottom: 1rem; }
.message { max-width: 75%; padding: 0.6rem 0.9rem; border-radius: 12px; white-space: pre-wrap; }
.message.user { align-self: flex-end; background: #9D5CFF; color: white; }
.message.bot { align-self: flex-start; background: #ece8f3; }
.pending { opacity: 0.6; }
.error { color: #b00020; }
input[type=text] { width: 70%; caret-color: #9D5CFF; }
button { background-color: #9D5CFF; color: white; border: none; padding: 0.4rem 0.9rem; border-radius: 6px; }
button:hover { background-color: #7B3FCC; }
button:disabled { opacity: 0.5; }
.clear { margin-top: 0.5rem; }
"#;

fn bubble_class(turn: &Turn) -> &'static str {
    match turn.role() {
        Role::User => "user",
        Role::Assistant => "bot",
    }
}

#[function_component]
fn App() -> Html {
    let input_ref = use_node_ref();

    let slug: UseStateHandle<Option<Uuid>> = use_state(|| None);
    let turns: UseStateHandle<Vec<Turn>> = use_state(Vec::new);
    let info: UseStateHandle<Option<InfoResponse>> = use_state(|| None);
    let pending = use_state(|| false);
    let error: UseStateHandle<Option<String>> = use_state(|| None);

    {
        let slug = slug.clone();
        use_event_with_window("pagehide", move |_: Event| {
            if let Some(slug) = *slug {
                wasm_bindgen_futures::spawn_local(async move {
                    // Idle expiry on the server drops it if this never arrives.
                    let _ = rpc::client().delete_session(slug).await;
                });
            }
        });
    }

    {
        let slug = slug.clone();
        let info = info.clone();
        let error = error.clone();

        use_effect_with_deps(
            move |_| {
                wasm_bindgen_futures::spawn_local(async move {
                    let client = rpc::client();

                    match client.info().await {
                        Ok(resp) => info.set(Some(resp)),
                        Err(e) => error.set(Some(e.to_string())),
                    }
                    match client.create_session().await {
                        Ok(resp) => slug.set(Some(resp.slug)),
                        Err(e) => error.set(Some(e.to_string())),
                    }
                });
            },
            (),
        );
    }

    let onsubmit = {
        let input_ref = input_ref.clone();
        let slug = slug.clone();
        let turns = turns.clone();
        let pending = pending.clone();
        let error = error.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let (Some(slug), Some(input)) = (*slug, input_ref.cast::<HtmlInputElement>()) else {
                return;
            };
            let message = input.value();
            if message.trim().is_empty() || *pending {
                return;
            }
            input.set_value("");
            pending.set(true);

            let turns = turns.clone();
            let pending = pending.clone();
            let error = error.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match rpc::client().send_message(slug, message.clone()).await {
                    Ok(resp) => {
                        turns.set(resp.turns);
                        error.set(None);
                    }
                    Err(e) => {
                        if input.value().is_empty() {
                            input.set_value(&message);
                        }
                        error.set(Some(e.to_string()));
                    }
                }
                pending.set(false);
            });
        })
    };

    let onclear = {
        let slug = slug.clone();
        let turns = turns.clone();
        let pending = pending.clone();
        let error = error.clone();

        Callback::from(move |_: MouseEvent| {
            let Some(slug) = *slug else {
                return;
            };
            if *pending {
                return;
            }

            let turns = turns.clone();
            let error = error.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match rpc::client().reset(slug).await {
                    Ok(resp) => turns.set(resp.turns),
                    Err(e) => error.set(Some(e.to_string())),
                }
            });
        })
    };

    let title = info
        .as_ref()
        .map(|i| i.title.clone())
        .unwrap_or_else(|| "AI Chatbot".to_owned());
    let disabled = *pending || slug.is_none();

    html! {
        <div class="app">
            <style>{ STYLE }</style>
            <aside class="sidebar">
                <h2>{ "About" }</h2>
                if let Some(i) = info.as_ref() {
                    <>
                        <p>{ &i.description }</p>
                        <p><small>{ format!("Model: {}", i.model) }</small></p>
                        if let Some(url) = i.dataset_url.as_ref() {
                            <p><a href={url.clone()} target="_blank">{ "Link to the dataset" }</a></p>
                        }
                    </>
                }
            </aside>
            <main>
                <h1>{ title }</h1>
                <div class="messages">
                    { for turns.iter().enumerate().map(|(i, turn)| html! {
                        <div key={i.to_string()} class={classes!("message", bubble_class(turn))}>
                            { turn.content() }
                        </div>
                    }) }
                    if *pending {
                        <div class="message bot pending">{ "…" }</div>
                    }
                </div>
                if let Some(e) = error.as_ref() {
                    <p class="error">{ e }</p>
                }
                <form {onsubmit}>
                    <label for="user_input">{ "You: " }</label>
                    <input id="user_input" ref={input_ref} type="text" autocomplete="off" />
                    <button type="submit" {disabled}>{ "Send" }</button>
                </form>
                <button class="clear" onclick={onclear} {disabled}>{ "Clear Chat" }</button>
            </main>
        </div>
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
