use crate::progression::POINTS_PER_LEVEL;
use crate::registry::{MAX_STATS, MIN_STATS};

pub fn render_index() -> String {
    INDEX_HTML
        .replace("{{MIN_STATS}}", &MIN_STATS.to_string())
        .replace("{{MAX_STATS}}", &MAX_STATS.to_string())
        .replace("{{POINTS_PER_LEVEL}}", &POINTS_PER_LEVEL.to_string())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Quest</title>
  <style>
    :root {
      --bg: #11131a;
      --card: #1b1f2b;
      --ink: #e8e6f0;
      --muted: #8c8aa0;
      --accent: #3ee6c4;
      --strength: #ff5f6d;
      --intelligence: #5c8dff;
      --endurance: #4fd67a;
      --primary: #3ee6c4;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px;
    }

    .app {
      width: min(520px, 100%);
      display: grid;
      gap: 20px;
    }

    .card {
      background: var(--card);
      border-radius: 16px;
      padding: 20px;
    }

    .bar {
      height: 10px;
      border-radius: 999px;
      background: #2a2f3f;
      overflow: hidden;
    }

    .bar span {
      display: block;
      height: 100%;
      background: var(--accent);
      transition: width 300ms ease;
    }

    .stat {
      display: flex;
      align-items: center;
      justify-content: space-between;
      border-left: 4px solid var(--primary);
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: #0b0d12;
    }

    button:disabled {
      opacity: 0.4;
      cursor: default;
    }

    .message {
      min-height: 1.4em;
      color: var(--muted);
      text-align: center;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>HABIT QUEST</h1>
      <p class="message">Level up your life, one habit at a time. {{POINTS_PER_LEVEL}} XP per level, {{MIN_STATS}}&ndash;{{MAX_STATS}} stats.</p>
    </header>
    <section class="card">
      <h2 id="character">Hero</h2>
      <p id="level">Level 1</p>
      <div class="bar"><span id="xp" style="width: 0%"></span></div>
      <p id="next"></p>
    </section>
    <section id="stats"></section>
    <p class="message" id="message"></p>
  </main>

  <script>
    const GUEST_KEY = 'habit-quest-guest-id';

    async function guestId() {
      let id = localStorage.getItem(GUEST_KEY);
      if (!id) {
        const res = await fetch('/api/session/guest', { method: 'POST' });
        id = (await res.json()).guest_id;
        localStorage.setItem(GUEST_KEY, id);
      }
      return id;
    }

    async function api(path, options = {}) {
      const headers = {
        'content-type': 'application/json',
        'x-guest-id': await guestId(),
        'x-utc-offset-minutes': String(-new Date().getTimezoneOffset()),
      };
      const res = await fetch(path, { ...options, headers });
      if (res.status === 401) {
        localStorage.removeItem(GUEST_KEY);
      }
      const body = res.status === 204 ? null : await res.json();
      if (!res.ok) {
        throw new Error(body ? body.message : res.statusText);
      }
      return body;
    }

    function say(text) {
      document.getElementById('message').textContent = text;
    }

    function render(dashboard) {
      const progress = dashboard.progress;
      document.getElementById('character').textContent = `${dashboard.avatar} ${dashboard.character_name}`;
      document.getElementById('level').textContent = `Level ${progress.level} · ${progress.title}`;
      document.getElementById('xp').style.width = `${progress.progress_percent}%`;
      document.getElementById('next').textContent = `${progress.points_to_next_level} XP to next level`;

      const list = document.getElementById('stats');
      list.innerHTML = '';
      for (const stat of dashboard.stats) {
        const row = document.createElement('div');
        row.className = 'card stat';
        row.style.borderLeftColor = `var(--${stat.color})`;
        row.innerHTML = `<span>${stat.emoji} ${stat.name} · ${stat.total_points}</span>`;
        const button = document.createElement('button');
        button.textContent = stat.can_complete ? 'Complete' : 'Done today';
        button.disabled = !stat.can_complete;
        button.addEventListener('click', async () => {
          button.disabled = true;
          try {
            const outcome = await api(`/api/stats/${stat.id}/complete`, { method: 'POST' });
            say(outcome.leveled_up ? `LEVEL UP! Now level ${outcome.new_level}!` : `+1 ${stat.name}!`);
          } catch (err) {
            say(err.message);
          }
          await load();
        });
        row.appendChild(button);
        list.appendChild(row);
      }
    }

    async function load() {
      try {
        let dashboard = await api('/api/dashboard');
        if (!dashboard.onboarding_completed) {
          await api('/api/onboarding', {
            method: 'POST',
            body: JSON.stringify({
              character_name: 'Hero',
              avatar: '🧑‍🚀',
              stats: [
                { name: 'Strength', emoji: '💪', color: 'strength', description: 'Exercise or workout' },
                { name: 'Intelligence', emoji: '📚', color: 'intelligence', description: 'Read or learn something new' },
                { name: 'Endurance', emoji: '🧘', color: 'endurance', description: 'Meditate or practice mindfulness' },
              ],
            }),
          });
          dashboard = await api('/api/dashboard');
        }
        render(dashboard);
      } catch (err) {
        say(err.message);
      }
    }

    load();
  </script>
</body>
</html>
"#;
